//! Result codes shared by the local driver, the broker and the wire.
//!
//! The numeric codes are fixed. The wire mapping is the identity on these
//! values, so a code is never downgraded while crossing the boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Numeric result codes as they appear on the wire.
pub mod codes {
    pub const OK: u32 = 0;
    pub const INVALID_PARAM: u32 = 1;
    pub const BUSY: u32 = 2;
    pub const EXCEPTION: u32 = 3;
    pub const NOT_FOUND: u32 = 4;
    pub const NO_MEMORY: u32 = 5;
    pub const NOT_SUPPORTED: u32 = 6;
    pub const NO_DRIVER: u32 = 7;
    pub const NO_DAEMON: u32 = 8;
    pub const NO_ACCESS: u32 = 9;
    pub const RECONF_ERROR: u32 = 10;
}

/// Outcome code of any remote or local operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum FpgaResult {
    Ok,
    InvalidParam,
    Busy,
    Exception,
    NotFound,
    NoMemory,
    NotSupported,
    NoDriver,
    NoDaemon,
    NoAccess,
    ReconfError,
}

impl FpgaResult {
    /// Every code, in wire order.
    pub const ALL: [FpgaResult; 11] = [
        FpgaResult::Ok,
        FpgaResult::InvalidParam,
        FpgaResult::Busy,
        FpgaResult::Exception,
        FpgaResult::NotFound,
        FpgaResult::NoMemory,
        FpgaResult::NotSupported,
        FpgaResult::NoDriver,
        FpgaResult::NoDaemon,
        FpgaResult::NoAccess,
        FpgaResult::ReconfError,
    ];

    /// Wire representation.
    pub const fn code(self) -> u32 {
        match self {
            FpgaResult::Ok => codes::OK,
            FpgaResult::InvalidParam => codes::INVALID_PARAM,
            FpgaResult::Busy => codes::BUSY,
            FpgaResult::Exception => codes::EXCEPTION,
            FpgaResult::NotFound => codes::NOT_FOUND,
            FpgaResult::NoMemory => codes::NO_MEMORY,
            FpgaResult::NotSupported => codes::NOT_SUPPORTED,
            FpgaResult::NoDriver => codes::NO_DRIVER,
            FpgaResult::NoDaemon => codes::NO_DAEMON,
            FpgaResult::NoAccess => codes::NO_ACCESS,
            FpgaResult::ReconfError => codes::RECONF_ERROR,
        }
    }

    /// Parse a wire code. Unknown codes have no meaning and yield `None`.
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            codes::OK => Some(FpgaResult::Ok),
            codes::INVALID_PARAM => Some(FpgaResult::InvalidParam),
            codes::BUSY => Some(FpgaResult::Busy),
            codes::EXCEPTION => Some(FpgaResult::Exception),
            codes::NOT_FOUND => Some(FpgaResult::NotFound),
            codes::NO_MEMORY => Some(FpgaResult::NoMemory),
            codes::NOT_SUPPORTED => Some(FpgaResult::NotSupported),
            codes::NO_DRIVER => Some(FpgaResult::NoDriver),
            codes::NO_DAEMON => Some(FpgaResult::NoDaemon),
            codes::NO_ACCESS => Some(FpgaResult::NoAccess),
            codes::RECONF_ERROR => Some(FpgaResult::ReconfError),
            _ => None,
        }
    }

    pub fn is_ok(self) -> bool {
        self == FpgaResult::Ok
    }

    /// Split into `Ok(())` or the matching error.
    pub fn into_result(self) -> Result<(), FpgaError> {
        match FpgaError::from_result(self) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Display for FpgaResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match FpgaError::from_result(*self) {
            Some(err) => write!(f, "{}", err),
            None => write!(f, "success"),
        }
    }
}

impl From<FpgaResult> for u32 {
    fn from(result: FpgaResult) -> Self {
        result.code()
    }
}

impl TryFrom<u32> for FpgaResult {
    type Error = UnknownResultCode;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        FpgaResult::from_code(code).ok_or(UnknownResultCode(code))
    }
}

/// A wire code outside the known table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown result code {0}")]
pub struct UnknownResultCode(pub u32);

/// Every non-success result code, as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum FpgaError {
    #[error("invalid parameter")]
    InvalidParam,
    #[error("resource busy")]
    Busy,
    #[error("exception")]
    Exception,
    #[error("not found")]
    NotFound,
    #[error("no memory")]
    NoMemory,
    #[error("not supported")]
    NotSupported,
    #[error("no driver available")]
    NoDriver,
    #[error("no daemon available")]
    NoDaemon,
    #[error("insufficient privileges")]
    NoAccess,
    #[error("reconfiguration error")]
    ReconfError,
}

impl FpgaError {
    /// `None` for `FpgaResult::Ok`.
    pub const fn from_result(result: FpgaResult) -> Option<Self> {
        match result {
            FpgaResult::Ok => None,
            FpgaResult::InvalidParam => Some(FpgaError::InvalidParam),
            FpgaResult::Busy => Some(FpgaError::Busy),
            FpgaResult::Exception => Some(FpgaError::Exception),
            FpgaResult::NotFound => Some(FpgaError::NotFound),
            FpgaResult::NoMemory => Some(FpgaError::NoMemory),
            FpgaResult::NotSupported => Some(FpgaError::NotSupported),
            FpgaResult::NoDriver => Some(FpgaError::NoDriver),
            FpgaResult::NoDaemon => Some(FpgaError::NoDaemon),
            FpgaResult::NoAccess => Some(FpgaError::NoAccess),
            FpgaResult::ReconfError => Some(FpgaError::ReconfError),
        }
    }
}

impl From<FpgaError> for FpgaResult {
    fn from(err: FpgaError) -> Self {
        match err {
            FpgaError::InvalidParam => FpgaResult::InvalidParam,
            FpgaError::Busy => FpgaResult::Busy,
            FpgaError::Exception => FpgaResult::Exception,
            FpgaError::NotFound => FpgaResult::NotFound,
            FpgaError::NoMemory => FpgaResult::NoMemory,
            FpgaError::NotSupported => FpgaResult::NotSupported,
            FpgaError::NoDriver => FpgaResult::NoDriver,
            FpgaError::NoDaemon => FpgaResult::NoDaemon,
            FpgaError::NoAccess => FpgaResult::NoAccess,
            FpgaError::ReconfError => FpgaResult::ReconfError,
        }
    }
}

/// Result type used by the local driver port and the dispatcher.
pub type DriverResult<T> = Result<T, FpgaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_mapping_is_bijective() {
        for result in FpgaResult::ALL {
            assert_eq!(FpgaResult::from_code(result.code()), Some(result));
        }
        let mut seen: Vec<u32> = FpgaResult::ALL.iter().map(|r| r.code()).collect();
        seen.dedup();
        assert_eq!(seen.len(), FpgaResult::ALL.len());
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(FpgaResult::from_code(11), None);
        assert_eq!(FpgaResult::try_from(99), Err(UnknownResultCode(99)));
    }

    #[test]
    fn test_error_conversion_round_trip() {
        for result in FpgaResult::ALL {
            match FpgaError::from_result(result) {
                Some(err) => assert_eq!(FpgaResult::from(err), result),
                None => assert!(result.is_ok()),
            }
        }
    }

    #[test]
    fn test_into_result() {
        assert_eq!(FpgaResult::Ok.into_result(), Ok(()));
        assert_eq!(
            FpgaResult::NotFound.into_result(),
            Err(FpgaError::NotFound)
        );
    }

    #[test]
    fn test_serialized_as_code() {
        let bytes = bincode::serialize(&FpgaResult::NoMemory).unwrap();
        let code: u32 = bincode::deserialize(&bytes).unwrap();
        assert_eq!(code, codes::NO_MEMORY);

        let bogus = bincode::serialize(&42u32).unwrap();
        assert!(bincode::deserialize::<FpgaResult>(&bogus).is_err());
    }
}
