//! # Wire Envelope
//!
//! Every frame body is a [`WireEnvelope`]. The header fields come first so a
//! receiver can recover them with [`crate::peek_header`] even when the
//! payload does not decode.

use crate::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope around a request or reply payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnvelope<T> {
    /// Protocol version. Checked before the payload is used.
    pub version: u16,
    /// For requests: fresh per call. For replies: copied from the request.
    pub correlation_id: Uuid,
    pub payload: T,
}

impl<T> WireEnvelope<T> {
    /// Wrap a request under a new correlation id.
    pub fn request(payload: T) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            correlation_id: Uuid::new_v4(),
            payload,
        }
    }

    /// Wrap a reply to the request carrying `correlation_id`.
    pub fn reply(correlation_id: Uuid, payload: T) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            correlation_id,
            payload,
        }
    }

    pub fn header(&self) -> EnvelopeHeader {
        EnvelopeHeader {
            version: self.version,
            correlation_id: self.correlation_id,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }
}

/// Leading fields of a [`WireEnvelope`], decodable on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    pub version: u16,
    pub correlation_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_gets_fresh_correlation() {
        let a = WireEnvelope::request(1u8);
        let b = WireEnvelope::request(1u8);
        assert_ne!(a.correlation_id, b.correlation_id);
        assert!(a.is_supported());
    }

    #[test]
    fn test_reply_echoes_correlation() {
        let request = WireEnvelope::request("ping");
        let reply = WireEnvelope::reply(request.correlation_id, "pong");
        assert_eq!(reply.header().correlation_id, request.correlation_id);
        assert_eq!(reply.version, PROTOCOL_VERSION);
    }
}
