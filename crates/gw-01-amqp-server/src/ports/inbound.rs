//! Inbound ports for the connection acceptor.

use crate::domain::error::EndpointError;
use async_trait::async_trait;
use shared_types::amqp::{ReceiverLink, SenderLink};
use shared_types::{ConnectionId, ResourceIdentifier};
use std::sync::Arc;

/// A link that passed authorization, handed to its endpoint.
#[derive(Clone)]
pub enum AttachedLink {
    /// The client sends on it; the endpoint receives.
    Receiver(Arc<dyn ReceiverLink>),
    /// The client receives on it; the endpoint sends.
    Sender(Arc<dyn SenderLink>),
}

impl AttachedLink {
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Receiver(link) => link.name(),
            Self::Sender(link) => link.name(),
        }
    }

    /// Id of the connection the link was attached on.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        match self {
            Self::Receiver(link) => link.attachments().connection_id(),
            Self::Sender(link) => link.attachments().connection_id(),
        }
    }

    #[must_use]
    pub fn local_address(&self) -> Option<String> {
        match self {
            Self::Receiver(link) => link.local_address(),
            Self::Sender(link) => link.local_address(),
        }
    }

    /// Answer the peer's attach.
    pub fn open(&self) {
        match self {
            Self::Receiver(link) => link.open(),
            Self::Sender(link) => link.open(),
        }
    }

    pub fn close(&self) {
        match self {
            Self::Receiver(link) => link.close(),
            Self::Sender(link) => link.close(),
        }
    }

    #[must_use]
    pub fn as_receiver(&self) -> Option<&Arc<dyn ReceiverLink>> {
        match self {
            Self::Receiver(link) => Some(link),
            Self::Sender(_) => None,
        }
    }

    #[must_use]
    pub fn as_sender(&self) -> Option<&Arc<dyn SenderLink>> {
        match self {
            Self::Sender(link) => Some(link),
            Self::Receiver(_) => None,
        }
    }
}

/// A functional endpoint (telemetry, registration, control, ...).
///
/// Registered once before the acceptor starts. Owns every link attached to
/// an address whose first segment equals [`Endpoint::name`].
#[async_trait]
pub trait Endpoint: Send + Sync {
    fn name(&self) -> &str;

    /// Called once during server start. All endpoints must succeed.
    async fn start(&self) -> Result<(), EndpointError>;

    async fn stop(&self) -> Result<(), EndpointError>;

    /// Take over an authorized link. The endpoint opens (or closes) it.
    fn on_link_attach(&self, link: AttachedLink, resource: ResourceIdentifier);
}
