//! Engine traits.
//!
//! Methods take `&self`: engine handles are cheap shared references into
//! the engine's own state, and every call for a connection happens on that
//! connection's execution context.

use super::attachments::Attachments;
use super::condition::{DeliveryState, ErrorCondition};
use super::message::Message;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by the AMQP engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The peer answered an attach with a detach.
    #[error("link attach refused by peer")]
    AttachRefused,

    /// The peer closed the endpoint, optionally with a condition.
    #[error("closed by peer{}", .0.as_ref().map(|c| format!(" ({c})")).unwrap_or_default())]
    RemoteClosed(Option<ErrorCondition>),

    /// The connection can no longer create links.
    #[error("connection is closed")]
    ConnectionClosed,

    /// Any other transport level failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Called once when the peer answers our open/attach.
pub type OpenHandler = Box<dyn FnOnce(Result<(), EngineError>) + Send>;

/// Called once when the peer closes/detaches.
pub type CloseHandler = Box<dyn FnOnce(Result<(), EngineError>) + Send>;

/// Called for every transfer arriving on a receiver link.
pub type MessageHandler = Arc<dyn Fn(Arc<dyn Delivery>, Message) + Send + Sync>;

/// Delivery guarantee of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QoS {
    /// Pre-settled transfers.
    AtMostOnce,
    /// Unsettled transfers, settled by the receiver.
    #[default]
    AtLeastOnce,
}

/// Our end's role on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Sender,
    Receiver,
}

/// Operations common to sender and receiver links.
pub trait Link: Send + Sync {
    fn role(&self) -> LinkRole;

    fn name(&self) -> String;

    /// Address offered by the peer: the target of a receiver link, the
    /// source of a sender link. `None` means an anonymous terminus.
    fn remote_address(&self) -> Option<String>;

    fn local_address(&self) -> Option<String>;

    fn set_local_address(&self, address: Option<String>);

    fn qos(&self) -> QoS;

    fn set_qos(&self, qos: QoS);

    /// Condition the peer sent with its detach, if any.
    fn remote_condition(&self) -> Option<ErrorCondition>;

    /// Condition to send with our detach.
    fn set_condition(&self, condition: Option<ErrorCondition>);

    fn attachments(&self) -> &Attachments;

    fn on_remote_open(&self, handler: OpenHandler);

    fn on_remote_close(&self, handler: CloseHandler);

    /// Send the attach frame.
    fn open(&self);

    /// Send the detach frame.
    fn close(&self);

    /// Release the engine's resources for this link.
    fn free(&self);

    fn is_open(&self) -> bool;
}

/// Our end sends messages.
pub trait SenderLink: Link {
    fn send(&self, message: Message) -> Result<(), EngineError>;

    /// Link credit granted by the peer.
    fn credit(&self) -> u32;
}

/// Our end receives messages.
pub trait ReceiverLink: Link {
    fn set_auto_accept(&self, auto_accept: bool);

    fn set_prefetch(&self, credits: u32);

    /// Grant additional credit to the peer.
    fn flow(&self, credits: u32);

    fn on_message(&self, handler: MessageHandler);
}

/// One received transfer.
pub trait Delivery: Send + Sync {
    fn tag(&self) -> Vec<u8>;

    /// Update the delivery outcome, optionally settling it.
    fn disposition(&self, state: DeliveryState, settle: bool);

    fn is_settled(&self) -> bool;
}

pub trait Session: Send + Sync {
    fn open(&self);

    fn close(&self);

    fn on_remote_close(&self, handler: CloseHandler);
}

/// One AMQP connection.
pub trait Connection: Send + Sync {
    /// Container id announced by the peer.
    fn remote_container(&self) -> Option<String>;

    /// Set our container id, sent with our open frame.
    fn set_container(&self, container: String);

    /// Principal established by SASL, if any.
    fn authenticated_subject(&self) -> Option<String>;

    fn attachments(&self) -> &Attachments;

    /// Install the handler receiving this connection's remote events.
    fn set_event_handler(&self, handler: Arc<dyn ConnectionEventHandler>);

    fn create_sender(&self, target: &str) -> Result<Arc<dyn SenderLink>, EngineError>;

    fn create_receiver(&self, source: &str) -> Result<Arc<dyn ReceiverLink>, EngineError>;

    fn open(&self);

    fn close(&self);

    /// Drop the transport without a close frame.
    fn disconnect(&self);
}

/// Remote events of one connection.
pub trait ConnectionEventHandler: Send + Sync {
    fn on_remote_open(&self, connection: Arc<dyn Connection>);

    fn on_session_open(&self, connection: Arc<dyn Connection>, session: Arc<dyn Session>);

    /// The peer attached a link on which it wants to send (we receive).
    fn on_receiver_open(&self, connection: Arc<dyn Connection>, receiver: Arc<dyn ReceiverLink>);

    /// The peer attached a link on which it wants to receive (we send).
    fn on_sender_open(&self, connection: Arc<dyn Connection>, sender: Arc<dyn SenderLink>);

    fn on_remote_close(&self, connection: Arc<dyn Connection>, result: Result<(), EngineError>);

    /// The transport went away without a close frame.
    fn on_disconnect(&self, connection: Arc<dyn Connection>);
}
