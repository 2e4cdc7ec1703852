//! Errors seen by callers of the client stub.

use shared_transport::TransportError;
use shared_types::{FpgaError, FpgaResult};
use thiserror::Error;

/// Failure of a remote call.
///
/// `Remote` means the broker answered with a non-success code. `Transport`
/// means no trustworthy answer arrived; reply contents are never used then.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("broker returned {0}")]
    Remote(FpgaError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CallError {
    /// Result code for callers that only understand codes.
    ///
    /// Transport failures report as `Exception`. The broker also answers
    /// `Exception` when it cannot register a resource it just created, so
    /// the code alone does not tell the two apart. Match on the variant or
    /// use [`CallError::is_transport`] when the distinction matters.
    pub fn result_code(&self) -> FpgaResult {
        match self {
            CallError::Remote(err) => (*err).into(),
            CallError::Transport(_) => FpgaResult::Exception,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, CallError::Transport(_))
    }
}

impl From<FpgaError> for CallError {
    fn from(err: FpgaError) -> Self {
        CallError::Remote(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code() {
        assert_eq!(
            CallError::Remote(FpgaError::NotFound).result_code(),
            FpgaResult::NotFound
        );
        let transport = CallError::from(TransportError::Closed);
        assert!(transport.is_transport());
        assert_eq!(transport.result_code(), FpgaResult::Exception);
    }

    #[test]
    fn test_remote_exception_is_not_transport() {
        let err = CallError::Remote(FpgaError::Exception);
        assert!(!err.is_transport());
        assert_eq!(err.result_code(), FpgaResult::Exception);
    }
}
