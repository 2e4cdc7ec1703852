//! TCP transport over a [`ClientConnection`].

use crate::ports::outbound::BrokerTransport;
use async_trait::async_trait;
use shared_transport::{ClientConnection, TransportError};
use shared_types::{Reply, Request};

#[async_trait]
impl BrokerTransport for ClientConnection {
    async fn round_trip(&self, request: Request) -> Result<Reply, TransportError> {
        self.call::<Request, Reply>(request).await
    }
}
