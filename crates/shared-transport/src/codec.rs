//! # Frame Codec
//!
//! Framing is a 4-byte big-endian length prefix handled by
//! [`LengthDelimitedCodec`]. Frame bodies are bincode-encoded envelopes.

use crate::envelope::{EnvelopeHeader, WireEnvelope};
use crate::error::TransportError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::LengthDelimitedCodec;

/// Build the length-delimited codec used on both ends of a connection.
pub fn frame_codec(max_frame_bytes: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .max_frame_length(max_frame_bytes)
        .new_codec()
}

/// Serialize an envelope into a frame body.
pub fn encode_envelope<T: Serialize>(envelope: &WireEnvelope<T>) -> Result<Bytes, TransportError> {
    bincode::serialize(envelope)
        .map(Bytes::from)
        .map_err(|e| TransportError::Encode(e.to_string()))
}

/// Deserialize a frame body into an envelope.
pub fn decode_envelope<T: DeserializeOwned>(frame: &[u8]) -> Result<WireEnvelope<T>, TransportError> {
    bincode::deserialize(frame).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Decode only the envelope header of a frame body.
///
/// Succeeds whenever the leading version and correlation id are intact,
/// whether or not the payload that follows is valid.
pub fn peek_header(frame: &[u8]) -> Result<EnvelopeHeader, TransportError> {
    bincode::deserialize(frame).map_err(|e| TransportError::Decode(e.to_string()))
}
