//! # Domain Layer - Dispatcher
//!
//! - `config`: dispatcher and listener settings
//! - `errors`: server lifecycle errors
//! - `patterns`: named fill patterns for buffer helpers

pub mod config;
pub mod errors;
pub mod patterns;

pub use config::{ConfigError, DispatcherConfig, ServerConfig, DEFAULT_MAX_PAYLOAD_BYTES};
pub use errors::ServerError;
pub use patterns::FillPattern;
