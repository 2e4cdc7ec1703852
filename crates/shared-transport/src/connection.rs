//! # Client Connection
//!
//! Lazily connected, self-healing TCP connection to the broker.
//!
//! - The first call connects; a call after a stream failure reconnects.
//! - Calls are serialized, so at most one request is in flight.
//! - Every call is bounded by the call timeout. A timed-out stream is
//!   dropped, since a late reply would otherwise answer the next call.

use crate::codec::{decode_envelope, encode_envelope, frame_codec};
use crate::envelope::WireEnvelope;
use crate::error::TransportError;
use crate::{DEFAULT_MAX_FRAME_BYTES, PROTOCOL_VERSION};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, warn};

type FramedStream = Framed<TcpStream, LengthDelimitedCodec>;

/// Where and how to reach the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// `host:port` of the broker.
    pub addr: String,
    pub connect_timeout: Duration,
    pub call_timeout: Duration,
    pub max_frame_bytes: usize,
}

impl ConnectionConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:50051".to_string(),
            connect_timeout: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// A single request/reply channel to the broker.
pub struct ClientConnection {
    config: ConnectionConfig,
    stream: Mutex<Option<FramedStream>>,
}

impl ClientConnection {
    /// Create an unconnected channel. Nothing is dialed until the first call.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            stream: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether a stream is currently established.
    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// Drop the current stream, if any.
    pub async fn disconnect(&self) {
        self.stream.lock().await.take();
    }

    /// Send `request` and wait for its reply.
    pub async fn call<Req, Rep>(&self, request: Req) -> Result<Rep, TransportError>
    where
        Req: Serialize,
        Rep: DeserializeOwned,
    {
        let mut guard = self.stream.lock().await;

        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => self.connect().await?,
        };

        let envelope = WireEnvelope::request(request);
        let timeout = self.config.call_timeout;
        let result = match tokio::time::timeout(timeout, Self::exchange(&mut stream, &envelope)).await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::CallTimeout {
                millis: timeout.as_millis() as u64,
            }),
        };

        match &result {
            Err(err) if err.poisons_connection() => {
                warn!(addr = %self.config.addr, error = %err, "Dropping broker connection");
            }
            _ => *guard = Some(stream),
        }

        result
    }

    async fn connect(&self) -> Result<FramedStream, TransportError> {
        let addr = self.config.addr.clone();
        debug!(addr = %addr, "Connecting to broker");

        let stream = match tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(addr.as_str()),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(TransportError::Connect { addr, source }),
            Err(_) => return Err(TransportError::ConnectTimeout { addr }),
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }

        Ok(Framed::new(
            stream,
            frame_codec(self.config.max_frame_bytes),
        ))
    }

    async fn exchange<Req, Rep>(
        stream: &mut FramedStream,
        envelope: &WireEnvelope<Req>,
    ) -> Result<Rep, TransportError>
    where
        Req: Serialize,
        Rep: DeserializeOwned,
    {
        stream.send(encode_envelope(envelope)?).await?;

        let frame = match stream.next().await {
            Some(frame) => frame?,
            None => return Err(TransportError::Closed),
        };

        let reply: WireEnvelope<Rep> = decode_envelope(&frame)?;
        if reply.version != PROTOCOL_VERSION {
            return Err(TransportError::UnsupportedVersion {
                received: reply.version,
                supported: PROTOCOL_VERSION,
            });
        }
        if reply.correlation_id != envelope.correlation_id {
            return Err(TransportError::CorrelationMismatch {
                expected: envelope.correlation_id,
                received: reply.correlation_id,
            });
        }

        Ok(reply.payload)
    }
}
