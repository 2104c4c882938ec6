//! Server configuration.
//!
//! Loaded from defaults, an optional TOML file and `GW_*` environment
//! variables, in that order, then validated.

use serde::{Deserialize, Serialize};
use shared_types::constants::{PORT_AMQP, PORT_AMQPS};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Heartbeat announced to peers. Idle peers are dropped after two misses.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(60_000);

/// Socket send/receive buffer size.
pub const SOCKET_BUFFER_SIZE: usize = 16 * 1024;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// First part of the AMQP container name.
    pub service_name: String,
    /// Address the secure listener binds to.
    pub bind_address: String,
    /// Secure port. Requires `tls`; defaults to 5671 when TLS is set.
    pub port: Option<u16>,
    pub insecure_port_enabled: bool,
    pub insecure_port_bind_address: String,
    /// Plain port. Defaults to 5672 when the insecure port is enabled.
    pub insecure_port: Option<u16>,
    pub tls: Option<TlsConfig>,
    /// Addresses carry no tenant; every link belongs to `DEFAULT_TENANT`.
    pub single_tenant: bool,
    /// Pass-through for transport frame logging.
    pub network_debug_logging: bool,
    /// Deadline for one authorization round-trip. Expiry denies the link.
    #[serde(with = "shared_types::duration_serde")]
    pub authorization_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: "IoT-Gateway".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: None,
            insecure_port_enabled: false,
            insecure_port_bind_address: "127.0.0.1".to_string(),
            insecure_port: None,
            tls: None,
            single_tenant: false,
            network_debug_logging: false,
            authorization_timeout: Duration::from_secs(5),
        }
    }
}

/// Key material for the secure listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TlsConfig {
    pub key_path: PathBuf,
    pub cert_path: PathBuf,
    /// When set, clients are asked for a certificate.
    pub trust_store_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Defaults, then `path` (if any), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Override fields from `GW_*` variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GW_AMQP_BIND_ADDRESS") {
            self.bind_address = v;
        }
        if let Some(v) = lookup("GW_AMQP_PORT") {
            self.port = Some(parse_port("GW_AMQP_PORT", &v)?);
        }
        if let Some(v) = lookup("GW_AMQP_INSECURE_PORT") {
            self.insecure_port = Some(parse_port("GW_AMQP_INSECURE_PORT", &v)?);
        }
        if let Some(v) = lookup("GW_AMQP_INSECURE_PORT_ENABLED") {
            self.insecure_port_enabled = parse_flag(&v);
        }
        if let Some(v) = lookup("GW_SINGLE_TENANT") {
            self.single_tenant = parse_flag(&v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::Invalid("service_name cannot be empty".into()));
        }
        if self.authorization_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "authorization_timeout cannot be 0".into(),
            ));
        }
        PortConfiguration::determine(self).map(|_| ())
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key}: not a port: {value}")))
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Ports the server listens on. `0` lets the OS pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfiguration {
    pub secure: Option<u16>,
    pub insecure: Option<u16>,
}

impl PortConfiguration {
    pub fn determine(config: &ServerConfig) -> Result<Self, ConfigError> {
        let secure = match (&config.tls, config.port) {
            (Some(_), port) => Some(port.unwrap_or(PORT_AMQPS)),
            (None, Some(_)) => return Err(ConfigError::TlsRequired),
            (None, None) => None,
        };

        let insecure = if config.insecure_port_enabled || config.insecure_port.is_some() {
            Some(config.insecure_port.unwrap_or(PORT_AMQP))
        } else {
            None
        };

        match (secure, insecure) {
            (None, None) => Err(ConfigError::NoPortConfigured),
            (Some(s), Some(i)) if s == i && s != 0 => Err(ConfigError::DuplicatePorts),
            _ => Ok(Self { secure, insecure }),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("neither secure nor insecure port configured")]
    NoPortConfigured,
    #[error("secure and insecure port must differ")]
    DuplicatePorts,
    #[error("secure port configured without TLS key material")]
    TlsRequired,
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("cannot read configuration: {0}")]
    Io(String),
    #[error("cannot parse configuration: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
