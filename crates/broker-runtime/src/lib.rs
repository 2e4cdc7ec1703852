//! # Accelerator Broker Runtime
//!
//! Library half of the `broker-runtime` executable.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Install the log subscriber
//! 3. Validate configuration and bind the listener
//! 4. Serve until Ctrl+C, then stop accepting and close sessions
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AR_HOST` | `127.0.0.1` | Listen address |
//! | `AR_PORT` | `50051` | Listen port |
//! | `AR_MAX_FRAME_BYTES` | `16777216` | Largest accepted frame |
//! | `AR_MAX_CONNECTIONS` | `64` | Concurrent clients |
//! | `AR_MAX_PAYLOAD_BYTES` | `8388608` | Largest byte payload per request |
//! | `AR_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `AR_JSON_LOGS` | `false` | JSON log output |
//! | `AR_SIM_DEVICES` | `1` | Simulated cards served |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod runtime;
pub mod telemetry;

pub use config::{BrokerConfig, LoggingConfig};
pub use runtime::BrokerRuntime;
pub use telemetry::{init_logging, TelemetryError};
