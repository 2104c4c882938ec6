//! Server error types.

use crate::domain::config::ConfigError;
use std::fmt;
use thiserror::Error;

/// Which listener a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    /// TLS protected, AMQPS.
    Secure,
    /// Plain AMQP.
    Insecure,
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secure => write!(f, "secure"),
            Self::Insecure => write!(f, "insecure"),
        }
    }
}

/// Failures reported by an endpoint's lifecycle methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("{0}")]
    Failed(String),

    /// The start/stop task panicked or was cancelled.
    #[error("endpoint task aborted: {0}")]
    Aborted(String),
}

/// Failures reported by the transport when binding a listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("cannot bind to {address}:{port}: {reason}")]
    Bind {
        address: String,
        port: u16,
        reason: String,
    },

    #[error("TLS setup failed: {0}")]
    Tls(String),
}

/// Errors from starting or stopping the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("endpoint [{name}] failed to start: {source}")]
    EndpointStart {
        name: String,
        #[source]
        source: EndpointError,
    },

    #[error("endpoint [{name}] failed to stop: {source}")]
    EndpointStop {
        name: String,
        #[source]
        source: EndpointError,
    },

    #[error("{kind} listener failed: {source}")]
    Bind {
        kind: ListenerKind,
        #[source]
        source: TransportError,
    },

    #[error("server already started")]
    AlreadyStarted,
}
