//! Cross-crate scenarios. Every test starts its own broker.

pub mod buffers;
pub mod enumeration;
pub mod handles;
pub mod transport;
