//! # Outbound Ports
//!
//! The client stub depends on a request/reply channel, not on TCP.

use async_trait::async_trait;
use shared_transport::TransportError;
use shared_types::{Reply, Request};

/// Carries one request to the broker and returns its reply.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    async fn round_trip(&self, request: Request) -> Result<Reply, TransportError>;
}
