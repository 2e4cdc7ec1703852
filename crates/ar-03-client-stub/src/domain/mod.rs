//! Client-side configuration and errors.

pub mod config;
pub mod errors;

pub use config::{ClientConfig, ClientConfigError};
pub use errors::CallError;
