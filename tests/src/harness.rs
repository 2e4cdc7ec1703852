//! Loopback broker for end-to-end tests.

use ar_02_dispatcher::{
    BrokerServer, Dispatcher, DispatcherConfig, RequestHandler, ServerConfig, ServerError,
    ShutdownHandle, SimulatedDriver,
};
use ar_03_client_stub::{CallError, ClientConfig, RemoteClient};
use shared_types::{flags, HandleHeader, ObjectType, Properties, RemoteId};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A broker serving simulated cards on an ephemeral loopback port.
pub struct TestBroker {
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher<SimulatedDriver>>,
    shutdown: ShutdownHandle,
    task: JoinHandle<Result<(), ServerError>>,
}

impl TestBroker {
    pub async fn start(cards: usize) -> Result<Self, ServerError> {
        Self::start_with(cards, DispatcherConfig::default()).await
    }

    pub async fn start_with(cards: usize, config: DispatcherConfig) -> Result<Self, ServerError> {
        let dispatcher = Arc::new(Dispatcher::new(SimulatedDriver::new(cards), config));
        let handler: Arc<dyn RequestHandler> = dispatcher.clone();
        let server = BrokerServer::bind(
            ServerConfig {
                port: 0,
                ..ServerConfig::default()
            },
            handler,
        )
        .await?;

        let addr = server.local_addr()?;
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(server.serve());
        Ok(Self {
            addr,
            dispatcher,
            shutdown,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Server-side view, for checking identity maps and driver call counts.
    pub fn dispatcher(&self) -> &Dispatcher<SimulatedDriver> {
        &self.dispatcher
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout_ms: 1_000,
            call_timeout_ms: 5_000,
            ..ClientConfig::new(self.addr.ip().to_string(), self.addr.port())
        }
    }

    /// A client with its own connection.
    pub fn client(&self) -> RemoteClient {
        match RemoteClient::new(&self.client_config()) {
            Ok(client) => client,
            Err(e) => panic!("loopback client config rejected: {e}"),
        }
    }

    /// Stop serving and wait for the accept loop to exit.
    pub async fn stop(self) -> Result<(), ServerError> {
        self.shutdown.shutdown();
        match self.task.await {
            Ok(result) => result,
            Err(e) => panic!("broker task failed: {e}"),
        }
    }
}

pub fn accelerator_filter() -> Properties {
    Properties {
        object_type: Some(ObjectType::Accelerator),
        ..Default::default()
    }
}

/// Id of the first accelerator the broker enumerates.
pub async fn accelerator_token(client: &RemoteClient) -> Result<RemoteId, CallError> {
    let found = client.enumerate(&[accelerator_filter()], 1).await?;
    match found.tokens.first() {
        Some(token) => Ok(token.token_id),
        None => panic!("broker has no accelerators"),
    }
}

/// Open the first accelerator in shared mode.
pub async fn open_accelerator(client: &RemoteClient) -> Result<HandleHeader, CallError> {
    let token_id = accelerator_token(client).await?;
    client.open(token_id, flags::OPEN_SHARED).await
}
