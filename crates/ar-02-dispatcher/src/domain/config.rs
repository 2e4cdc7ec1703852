//! # Dispatcher and Server Configuration

use serde::{Deserialize, Serialize};
use shared_transport::DEFAULT_MAX_FRAME_BYTES;
use thiserror::Error;

/// Largest single byte payload a request may carry or ask for.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 8 * 1024 * 1024;

/// Limits applied by the dispatcher itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Upper bound for memcpy, object reads and write-mmio512 payloads.
    pub max_payload_bytes: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_payload_bytes must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_frame_bytes: usize,
    /// Concurrent client connections; further accepts wait for a slot.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            max_connections: 64,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.max_frame_bytes < 1024 {
            return Err(ConfigError::InvalidLimit(format!(
                "max_frame_bytes {} is below 1024",
                self.max_frame_bytes
            )));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_connections must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(DispatcherConfig::default().validate().is_ok());
        assert!(ServerConfig::default().validate().is_ok());
        assert_eq!(ServerConfig::default().bind_addr(), "127.0.0.1:50051");
    }

    #[test]
    fn test_rejects_zero_limits() {
        let config = DispatcherConfig {
            max_payload_bytes: 0,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLimit(_))
        ));

        let server = ServerConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert!(server.validate().is_err());

        let server = ServerConfig {
            host: " ".into(),
            ..Default::default()
        };
        assert!(matches!(server.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ServerConfig = serde_json::from_str(r#"{"port": 6000}"#).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
    }
}
