//! # Gateway Events
//!
//! Notifications published on the bus. Every event has a well-known
//! address and a string payload, so non-Rust consumers can be bridged in.

use serde::{Deserialize, Serialize};
use shared_types::constants::CONNECTION_CLOSED_ADDRESS;
use shared_types::ConnectionId;

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum GatewayEvent {
    /// An AMQP connection went away (close frame or dropped transport).
    /// Emitted once per connection that had been assigned an id.
    ConnectionClosed { connection_id: ConnectionId },
}

impl GatewayEvent {
    /// Address the event is published on.
    #[must_use]
    pub fn address(&self) -> &'static str {
        match self {
            Self::ConnectionClosed { .. } => CONNECTION_CLOSED_ADDRESS,
        }
    }

    /// Wire payload.
    #[must_use]
    pub fn payload(&self) -> String {
        match self {
            Self::ConnectionClosed { connection_id } => connection_id.to_string(),
        }
    }
}

/// Selects events by address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Addresses to include. Empty means all addresses.
    pub addresses: Vec<String>,
}

impl EventFilter {
    /// Accept all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept events published on one of `addresses`.
    #[must_use]
    pub fn addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn matches(&self, event: &GatewayEvent) -> bool {
        self.addresses.is_empty() || self.addresses.iter().any(|a| a == event.address())
    }
}
