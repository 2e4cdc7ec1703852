//! # Accelerator Broker Dispatcher
//!
//! Server side of the remote-access broker. Clients name every resource by
//! a [`RemoteId`](shared_types::RemoteId); the dispatcher resolves those ids
//! to native handles, calls the local driver and issues ids for whatever
//! the driver creates.
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement |
//! |-----------|-------------|
//! | Unknown or sentinel ids never reach the driver | `Dispatcher::lookup` |
//! | Buffers and MMIO mappings are only usable through their handle | `Dispatcher::resolve_owned` |
//! | An id is removed only after the local destroy succeeded | claim / commit in `Dispatcher` |
//! | Every request gets exactly one reply | `adapters::server` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ports/inbound.rs       - RequestHandler (driven by the listener)
//! ports/outbound.rs      - AcceleratorDriver (the local library)
//! domain/config.rs       - DispatcherConfig, ServerConfig
//! domain/patterns.rs     - fill patterns for buffer helpers
//! service.rs             - Dispatcher: one method per remote operation
//! adapters/rpc.rs        - Request -> Dispatcher -> Reply
//! adapters/server.rs     - TCP listener, sessions, shutdown
//! adapters/simulated/    - in-memory driver
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{BrokerServer, SessionInfo, ShutdownHandle, SimulatedDriver};
pub use domain::{ConfigError, DispatcherConfig, ServerConfig, ServerError};
pub use ports::{AcceleratorDriver, LocalProperties, LocalToken, PreparedBuffer, RequestHandler};
pub use service::Dispatcher;
