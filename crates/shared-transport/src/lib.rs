//! # Shared Transport
//!
//! Byte-level plumbing between the client stub and the broker.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────────┬───────────────────────────────────────────────┐
//! │ u32 BE length    │ bincode(WireEnvelope { version,               │
//! │                  │                        correlation_id,        │
//! │                  │                        payload })             │
//! └──────────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! - Frames are bounded by a configurable maximum (16 MiB by default).
//! - Every reply echoes the correlation id of its request.
//! - A client connection carries one outstanding call at a time.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod codec;
pub mod connection;
pub mod envelope;
pub mod error;

pub use codec::{decode_envelope, encode_envelope, frame_codec, peek_header};
pub use connection::{ClientConnection, ConnectionConfig};
pub use envelope::{EnvelopeHeader, WireEnvelope};
pub use error::TransportError;

/// Current protocol version for broker frames.
pub const PROTOCOL_VERSION: u16 = 1;

/// Default upper bound on a single frame body.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
