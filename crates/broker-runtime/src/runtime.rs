//! # Broker Runtime
//!
//! Wires the simulated driver, the dispatcher and the TCP server together.

use crate::config::BrokerConfig;
use ar_02_dispatcher::{
    BrokerServer, Dispatcher, RequestHandler, ServerError, ShutdownHandle, SimulatedDriver,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// A bound broker, ready to serve.
pub struct BrokerRuntime {
    server: BrokerServer,
}

impl BrokerRuntime {
    /// Validate `config`, build the dispatcher and bind the listener.
    pub async fn bind(config: BrokerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let driver = SimulatedDriver::new(config.sim_devices);
        let dispatcher = Dispatcher::new(driver, config.dispatcher.clone());
        let handler: Arc<dyn RequestHandler> = Arc::new(dispatcher);

        let server = BrokerServer::bind(config.server.clone(), handler).await?;
        info!(
            addr = %server.local_addr()?,
            sim_devices = config.sim_devices,
            max_payload_bytes = config.dispatcher.max_payload_bytes,
            "Broker bound"
        );
        Ok(Self { server })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.server.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.server.shutdown_handle()
    }

    /// Serve until the shutdown handle fires.
    pub async fn run(self) -> Result<(), ServerError> {
        self.server.serve().await?;
        info!("Broker stopped");
        Ok(())
    }
}
