//! # Broker Server
//!
//! TCP listener in front of a [`RequestHandler`].
//!
//! One task per connection reads length-prefixed frames, answers them in
//! order, and hands each request to the blocking pool so slow driver calls
//! never stall the runtime. Frames that cannot be used are answered with
//! `Reply::Rejected` and the connection stays open; only a framing error
//! or the peer hanging up ends it.

use crate::domain::config::ServerConfig;
use crate::domain::errors::ServerError;
use crate::ports::inbound::RequestHandler;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use shared_transport::{
    decode_envelope, encode_envelope, frame_codec, peek_header, TransportError, WireEnvelope,
    PROTOCOL_VERSION,
};
use shared_types::{Reply, Request};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Bookkeeping for one client connection.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub peer: SocketAddr,
    pub connected_at: Instant,
    pub requests: u64,
}

/// Stops a running [`BrokerServer`] and its connections.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

pub struct BrokerServer {
    listener: TcpListener,
    handler: Arc<dyn RequestHandler>,
    config: ServerConfig,
    sessions: Arc<DashMap<Uuid, SessionInfo>>,
    slots: Arc<Semaphore>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl BrokerServer {
    /// Validate `config` and bind its address.
    pub async fn bind(
        config: ServerConfig,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            listener,
            handler,
            slots: Arc::new(Semaphore::new(config.max_connections)),
            config,
            sessions: Arc::new(DashMap::new()),
            shutdown: Arc::new(shutdown),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown),
        }
    }

    /// Live session table, shared with the connection tasks.
    pub fn sessions(&self) -> Arc<DashMap<Uuid, SessionInfo>> {
        Arc::clone(&self.sessions)
    }

    /// Accept connections until shutdown is requested.
    pub async fn serve(self) -> Result<(), ServerError> {
        let local_addr = self.local_addr()?;
        info!(
            addr = %local_addr,
            max_connections = self.config.max_connections,
            "Broker listening"
        );

        let mut stop = self.shutdown.subscribe();
        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = stopped(&mut stop) => break,
            };

            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
                _ = stopped(&mut stop) => break,
            };

            let session_id = Uuid::new_v4();
            let span = info_span!("session", %session_id, %peer);
            tokio::spawn(
                handle_connection(
                    stream,
                    peer,
                    session_id,
                    Arc::clone(&self.handler),
                    self.config.max_frame_bytes,
                    Arc::clone(&self.sessions),
                    self.shutdown.subscribe(),
                    permit,
                )
                .instrument(span),
            );
        }

        info!(addr = %local_addr, "Broker stopped accepting connections");
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    session_id: Uuid,
    handler: Arc<dyn RequestHandler>,
    max_frame_bytes: usize,
    sessions: Arc<DashMap<Uuid, SessionInfo>>,
    mut stop: watch::Receiver<bool>,
    _permit: OwnedSemaphorePermit,
) {
    info!("Client connected");
    if let Err(e) = stream.set_nodelay(true) {
        warn!(error = %e, "Failed to set TCP_NODELAY");
    }
    sessions.insert(
        session_id,
        SessionInfo {
            peer,
            connected_at: Instant::now(),
            requests: 0,
        },
    );

    let mut framed = Framed::new(stream, frame_codec(max_frame_bytes));
    loop {
        let next = tokio::select! {
            biased;
            _ = stopped(&mut stop) => {
                debug!("Closing connection for shutdown");
                break;
            }
            next = framed.next() => next,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                warn!(error = %e, "Framing error, closing connection");
                break;
            }
            None => break,
        };

        let reply = match process_frame(&handler, frame).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Failed to encode reply, closing connection");
                break;
            }
        };

        if let Some(mut session) = sessions.get_mut(&session_id) {
            session.requests += 1;
        }
        if let Err(e) = framed.send(reply).await {
            error!(error = %e, "Failed to write reply");
            break;
        }
    }

    let served = sessions
        .remove(&session_id)
        .map(|(_, session)| session.requests)
        .unwrap_or_default();
    info!(requests = served, "Client disconnected");
}

/// Resolves once shutdown has been requested or the server is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

/// Turn one request frame into one reply frame.
async fn process_frame(
    handler: &Arc<dyn RequestHandler>,
    frame: BytesMut,
) -> Result<Bytes, TransportError> {
    let header = match peek_header(&frame) {
        Ok(header) => header,
        Err(e) => {
            warn!(error = %e, len = frame.len(), "Undecodable frame");
            return rejected(Uuid::nil(), e.to_string());
        }
    };

    if header.version != PROTOCOL_VERSION {
        let err = TransportError::UnsupportedVersion {
            received: header.version,
            supported: PROTOCOL_VERSION,
        };
        warn!(correlation_id = %header.correlation_id, error = %err, "Rejecting request");
        return rejected(header.correlation_id, err.to_string());
    }

    let envelope: WireEnvelope<Request> = match decode_envelope(&frame) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(correlation_id = %header.correlation_id, error = %e, "Rejecting request");
            return rejected(header.correlation_id, e.to_string());
        }
    };

    let handler = Arc::clone(handler);
    let reply = match tokio::task::spawn_blocking(move || handler.handle(envelope.payload)).await
    {
        Ok(reply) => reply,
        Err(e) => {
            error!(correlation_id = %header.correlation_id, error = %e, "Request handler failed");
            Reply::Rejected {
                reason: "request handler failed".to_string(),
            }
        }
    };

    encode_envelope(&WireEnvelope::reply(header.correlation_id, reply))
}

fn rejected(correlation_id: Uuid, reason: String) -> Result<Bytes, TransportError> {
    encode_envelope(&WireEnvelope::reply(
        correlation_id,
        Reply::Rejected { reason },
    ))
}
