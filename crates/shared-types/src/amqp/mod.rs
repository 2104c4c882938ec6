//! # AMQP 1.0 Engine Port
//!
//! The subset of the AMQP 1.0 object model the gateway core needs:
//! connections, sessions, links and deliveries, plus the message and error
//! condition types they carry.
//!
//! An engine adapter implements [`Connection`], [`Session`], [`SenderLink`],
//! [`ReceiverLink`] and [`Delivery`], and drives a
//! [`ConnectionEventHandler`] with the remote peer's frames. All callbacks
//! for one connection run on that connection's execution context.

pub mod attachments;
pub mod condition;
pub mod engine;
pub mod message;

pub use attachments::Attachments;
pub use condition::{DeliveryState, ErrorCondition};
pub use engine::{
    CloseHandler, Connection, ConnectionEventHandler, Delivery, EngineError, Link, LinkRole,
    MessageHandler, OpenHandler, QoS, ReceiverLink, SenderLink, Session,
};
pub use message::{Message, MessageId};
