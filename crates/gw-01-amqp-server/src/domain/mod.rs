//! Domain layer: configuration, errors and the per-connection lifecycle.

pub mod config;
pub mod connection;
pub mod error;

pub use config::{ConfigError, PortConfiguration, ServerConfig, TlsConfig};
pub use connection::{ConnectionLifecycle, ConnectionState};
pub use error::{EndpointError, ListenerKind, ServerError, TransportError};
