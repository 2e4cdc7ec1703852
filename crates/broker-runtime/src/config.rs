//! Broker configuration from environment variables.

use ar_02_dispatcher::{ConfigError, DispatcherConfig, ServerConfig};
use serde::{Deserialize, Serialize};
use std::env;

/// Simulated cards served when no hardware backend is linked.
pub const DEFAULT_SIM_DEVICES: usize = 1;

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full
    /// `EnvFilter` expression).
    pub log_level: String,
    /// Emit one JSON object per event instead of pretty text.
    pub json_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Everything the broker needs to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub server: ServerConfig,
    pub dispatcher: DispatcherConfig,
    pub logging: LoggingConfig,
    pub sim_devices: usize,
}

impl BrokerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AR_HOST`: Listen address (default: 127.0.0.1)
    /// - `AR_PORT`: Listen port (default: 50051)
    /// - `AR_MAX_FRAME_BYTES`: Largest accepted frame (default: 16 MiB)
    /// - `AR_MAX_CONNECTIONS`: Concurrent clients (default: 64)
    /// - `AR_MAX_PAYLOAD_BYTES`: Largest byte payload per request (default: 8 MiB)
    /// - `AR_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `AR_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `AR_SIM_DEVICES`: Simulated cards to serve (default: 1)
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            server: ServerConfig {
                host: lookup("AR_HOST").unwrap_or(defaults.server.host),
                port: number("AR_PORT")
                    .and_then(|v| u16::try_from(v).ok())
                    .unwrap_or(defaults.server.port),
                max_frame_bytes: number("AR_MAX_FRAME_BYTES")
                    .and_then(|v| usize::try_from(v).ok())
                    .unwrap_or(defaults.server.max_frame_bytes),
                max_connections: number("AR_MAX_CONNECTIONS")
                    .and_then(|v| usize::try_from(v).ok())
                    .unwrap_or(defaults.server.max_connections),
            },
            dispatcher: DispatcherConfig {
                max_payload_bytes: number("AR_MAX_PAYLOAD_BYTES")
                    .unwrap_or(defaults.dispatcher.max_payload_bytes),
            },
            logging: LoggingConfig {
                log_level: lookup("AR_LOG_LEVEL")
                    .or_else(|| lookup("RUST_LOG"))
                    .unwrap_or(defaults.logging.log_level),
                json_logs: lookup("AR_JSON_LOGS")
                    .map(|v| v.to_lowercase() == "true" || v == "1")
                    .unwrap_or(defaults.logging.json_logs),
            },
            sim_devices: number("AR_SIM_DEVICES")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(DEFAULT_SIM_DEVICES),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.dispatcher.validate()?;
        if self.sim_devices == 0 {
            return Err(ConfigError::InvalidLimit(
                "sim_devices must be positive".into(),
            ));
        }
        // Every frame must be able to carry a full payload plus its envelope.
        if self.dispatcher.max_payload_bytes as u128 >= self.server.max_frame_bytes as u128 {
            return Err(ConfigError::InvalidLimit(format!(
                "max_payload_bytes {} must be below max_frame_bytes {}",
                self.dispatcher.max_payload_bytes, self.server.max_frame_bytes
            )));
        }
        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            dispatcher: DispatcherConfig::default(),
            logging: LoggingConfig::default(),
            sim_devices: DEFAULT_SIM_DEVICES,
        }
    }
}
