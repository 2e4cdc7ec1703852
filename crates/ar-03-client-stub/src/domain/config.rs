//! # Client Configuration

use serde::{Deserialize, Serialize};
use shared_transport::{ConnectionConfig, DEFAULT_MAX_FRAME_BYTES};
use std::time::Duration;
use thiserror::Error;

/// Where the broker lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    /// Bound on a single request/reply exchange. Buffer polls count against it.
    pub call_timeout_ms: u64,
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
            connect_timeout_ms: 5_000,
            call_timeout_ms: 30_000,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ClientConfigError> {
        if self.host.trim().is_empty() {
            return Err(ClientConfigError::Invalid("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ClientConfigError::Invalid("port must not be 0".into()));
        }
        if self.connect_timeout_ms == 0 || self.call_timeout_ms == 0 {
            return Err(ClientConfigError::InvalidLimit(
                "timeouts must be positive".into(),
            ));
        }
        if self.max_frame_bytes < 1024 {
            return Err(ClientConfigError::InvalidLimit(format!(
                "max_frame_bytes {} is below 1024",
                self.max_frame_bytes
            )));
        }
        Ok(())
    }

    /// Transport settings derived from this config.
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            addr: format!("{}:{}", self.host, self.port),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            max_frame_bytes: self.max_frame_bytes,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientConfigError {
    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid client config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = ClientConfig::new("", 1);
        assert!(matches!(config.validate(), Err(ClientConfigError::Invalid(_))));

        config.host = "broker".into();
        config.call_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ClientConfigError::InvalidLimit(_))
        ));
    }

    #[test]
    fn test_connection_settings() {
        let config = ClientConfig {
            connect_timeout_ms: 250,
            ..ClientConfig::new("10.0.0.2", 7000)
        };
        let connection = config.connection();
        assert_eq!(connection.addr, "10.0.0.2:7000");
        assert_eq!(connection.connect_timeout, Duration::from_millis(250));
        assert_eq!(connection.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"port": 6000}"#).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.host, "127.0.0.1");
    }
}
