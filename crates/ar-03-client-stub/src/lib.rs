//! # Accelerator Broker Client Stub
//!
//! Async counterpart of the local accelerator API for a device hosted by a
//! remote broker. Every resource is named by the [`RemoteId`](shared_types::RemoteId)
//! the broker issued for it.
//!
//! ## Error Model
//!
//! | Outcome | Returned as |
//! |---------|-------------|
//! | Broker answered `Ok` | `Ok(value)` |
//! | Broker answered another code | `CallError::Remote` |
//! | No trustworthy answer (connect, timeout, decode, wrong reply) | `CallError::Transport` |
//!
//! ## Example
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use ar_03_client_stub::{ClientConfig, RemoteClient};
//!
//! let client = RemoteClient::new(&ClientConfig::new("127.0.0.1", 50051))?;
//! let found = client.enumerate(&[], 4).await?;
//! if let Some(token) = found.tokens.first() {
//!     let handle = client.open(token.token_id, 0).await?;
//!     client.close(handle.handle_id).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{CallError, ClientConfig, ClientConfigError};
pub use ports::BrokerTransport;
pub use service::RemoteClient;
