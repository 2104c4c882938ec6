//! # Shared Bus - In-Process Message Bus
//!
//! Carries the gateway's internal traffic between components that must not
//! hold references to each other:
//!
//! - **Events** (publish/subscribe): fire-and-forget notifications such as
//!   "connection closed", fanned out to every subscriber whose filter
//!   matches the event's address.
//! - **Requests** (point-to-point): a single consumer registered on an
//!   address answers each request exactly once, e.g. the authorization
//!   service on `authorization.in`.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe()  ┌────────────┐
//! │  Acceptor    │ ────────────▶ │  Event Bus   │ ────────────▶ │ Listeners  │
//! │              │   request()   │              │   consumer    │            │
//! │              │ ◀───────────▶ │              │ ◀───────────▶ │ AuthZ svc  │
//! └──────────────┘               └──────────────┘               └────────────┘
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod request;
pub mod subscriber;

pub use events::{EventFilter, GatewayEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use request::{BusRequest, RequestError, RequestSender};
pub use subscriber::{EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Maximum queued requests per consumer.
pub const DEFAULT_CONSUMER_CAPACITY: usize = 256;

