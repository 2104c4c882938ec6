//! Client configuration.

use serde::{Deserialize, Serialize};
use shared_types::constants::PORT_AMQPS;
use std::time::Duration;

/// Settings for internal AMQP clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Container name announced to the peer.
    pub name: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    /// Deadline for the peer's attach answer.
    #[serde(with = "shared_types::duration_serde")]
    pub link_establishment_timeout: Duration,
    /// Prefetch granted on receiver links.
    pub initial_credits: u32,
    #[serde(with = "shared_types::duration_serde")]
    pub flow_latency: Duration,
    #[serde(with = "shared_types::duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: None,
            host: "localhost".to_string(),
            port: PORT_AMQPS,
            username: None,
            link_establishment_timeout: Duration::from_millis(1000),
            initial_credits: 200,
            flow_latency: Duration::from_millis(20),
            request_timeout: Duration::from_millis(200),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("host cannot be empty".into()));
        }
        if self.link_establishment_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "link_establishment_timeout cannot be 0".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout cannot be 0".into(),
            ));
        }
        if self.initial_credits == 0 {
            return Err(ConfigError::Invalid("initial_credits cannot be 0".into()));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.link_establishment_timeout, Duration::from_secs(1));
        assert_eq!(config.initial_credits, 200);
        assert_eq!(config.port, 5671);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ClientConfig {
            link_establishment_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_from_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            host = "registry.local"
            link_establishment_timeout = "250ms"
            initial_credits = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.host, "registry.local");
        assert_eq!(config.link_establishment_timeout, Duration::from_millis(250));
        assert_eq!(config.initial_credits, 50);
        assert_eq!(config.request_timeout, Duration::from_millis(200));
    }
}
