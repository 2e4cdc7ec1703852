//! # Inbound Port - RequestHandler
//!
//! What the listener drives: one decoded request in, one reply out.

use shared_types::{Reply, Request};

/// Synchronous request handler.
///
/// The server calls this from the blocking pool, so implementations may
/// block on the driver.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: Request) -> Reply;
}
