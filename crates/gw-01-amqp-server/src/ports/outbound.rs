//! Outbound ports for the connection acceptor.

use crate::domain::config::{ServerConfig, TlsConfig, HEARTBEAT_INTERVAL, SOCKET_BUFFER_SIZE};
use crate::domain::error::TransportError;
use async_trait::async_trait;
use shared_types::amqp::Connection;
use shared_types::{Permission, ResourceIdentifier};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a subject may use a resource.
///
/// Any failure to reach a decision must be reported as `false`.
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    async fn is_authorized(
        &self,
        subject: &str,
        resource: &ResourceIdentifier,
        permission: Permission,
    ) -> bool;
}

/// Whether the TLS listener asks for client certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuth {
    None,
    Request,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    pub key_path: PathBuf,
    pub cert_path: PathBuf,
    pub trust_store_path: Option<PathBuf>,
    pub client_auth: ClientAuth,
}

impl From<&TlsConfig> for TlsOptions {
    fn from(tls: &TlsConfig) -> Self {
        Self {
            key_path: tls.key_path.clone(),
            cert_path: tls.cert_path.clone(),
            trust_store_path: tls.trust_store_path.clone(),
            client_auth: if tls.trust_store_path.is_some() {
                ClientAuth::Request
            } else {
                ClientAuth::None
            },
        }
    }
}

/// Everything the transport needs to open one listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenOptions {
    pub bind_address: String,
    /// `0` lets the OS choose.
    pub port: u16,
    pub tls: Option<TlsOptions>,
    pub heartbeat: Duration,
    pub send_buffer_size: usize,
    pub receive_buffer_size: usize,
    /// Log AMQP frames.
    pub log_activity: bool,
}

impl ListenOptions {
    /// Options for the TLS listener.
    #[must_use]
    pub fn secure(config: &ServerConfig, port: u16) -> Self {
        Self {
            tls: config.tls.as_ref().map(TlsOptions::from),
            ..Self::base(config, &config.bind_address, port)
        }
    }

    /// Options for the plain listener.
    #[must_use]
    pub fn insecure(config: &ServerConfig, port: u16) -> Self {
        Self::base(config, &config.insecure_port_bind_address, port)
    }

    fn base(config: &ServerConfig, bind_address: &str, port: u16) -> Self {
        Self {
            bind_address: bind_address.to_string(),
            port,
            tls: None,
            heartbeat: HEARTBEAT_INTERVAL,
            send_buffer_size: SOCKET_BUFFER_SIZE,
            receive_buffer_size: SOCKET_BUFFER_SIZE,
            log_activity: config.network_debug_logging,
        }
    }
}

/// Receives connections accepted by a listener.
pub trait ConnectionListener: Send + Sync {
    fn on_connection(&self, connection: Arc<dyn Connection>);
}

/// A listener bound by the transport.
#[async_trait]
pub trait BoundListener: Send + Sync {
    /// The port actually bound.
    fn local_port(&self) -> u16;

    async fn close(&self);
}

/// Binds AMQP listeners (TCP, TLS, SASL, framing).
#[async_trait]
pub trait TransportServer: Send + Sync {
    async fn listen(
        &self,
        options: ListenOptions,
        listener: Arc<dyn ConnectionListener>,
    ) -> Result<Box<dyn BoundListener>, TransportError>;
}
