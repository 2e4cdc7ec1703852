//! Adapters layer for the dispatcher.
//!
//! - `rpc`: `RequestHandler` for `Dispatcher`
//! - `server`: TCP listener and session table
//! - `simulated`: in-memory `AcceleratorDriver`

pub mod rpc;
pub mod server;
pub mod simulated;

pub use server::{BrokerServer, SessionInfo, ShutdownHandle};
pub use simulated::SimulatedDriver;
