//! Ports layer for the dispatcher.
//!
//! - Inbound (Driving) port: `RequestHandler`, called by the listener
//! - Outbound (Driven) port: `AcceleratorDriver`, the local library

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
