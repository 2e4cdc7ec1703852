//! Ports for the remote identity layer.

pub mod outbound;

pub use outbound::IdSource;
