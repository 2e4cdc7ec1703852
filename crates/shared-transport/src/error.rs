//! Transport-level failures. None of these carry a device result code.

use std::io;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker could not be reached.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("connecting to {addr} timed out")]
    ConnectTimeout { addr: String },

    #[error("call timed out after {millis}ms")]
    CallTimeout { millis: u64 },

    /// The peer closed the connection before replying.
    #[error("connection closed by peer")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode frame: {0}")]
    Encode(String),

    #[error("failed to decode frame: {0}")]
    Decode(String),

    #[error("unsupported protocol version {received} (supported: {supported})")]
    UnsupportedVersion { received: u16, supported: u16 },

    #[error("reply correlation {received} does not match request {expected}")]
    CorrelationMismatch { expected: Uuid, received: Uuid },

    /// The reply decoded but is not a valid answer to the request.
    #[error("unexpected reply to {method}: {detail}")]
    UnexpectedReply { method: &'static str, detail: String },

    /// The broker refused the request frame.
    #[error("request rejected by broker: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Whether the underlying connection can no longer be trusted.
    ///
    /// Reply-level errors leave the stream in sync; everything else forces
    /// a reconnect on the next call.
    pub fn poisons_connection(&self) -> bool {
        !matches!(
            self,
            TransportError::UnexpectedReply { .. } | TransportError::Rejected(_)
        )
    }
}
