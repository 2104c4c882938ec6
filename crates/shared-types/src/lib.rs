//! # Shared Types Crate
//!
//! Types shared by the gateway crates: resource addressing, identifiers,
//! well-known addresses and the AMQP 1.0 engine port.
//!
//! ## Design Principles
//!
//! - **Engine agnostic**: the connection acceptor, the link establisher and
//!   the command parser are written against the traits in [`amqp`]. Frame
//!   encoding, SASL and TLS live in an engine adapter.
//! - **Strict addressing**: [`ResourceIdentifier`] splits on `/` and never
//!   normalizes. A leading slash adds an empty endpoint segment, trailing
//!   slashes are dropped and so lower the segment count.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod amqp;
pub mod authorization;
pub mod constants;
pub mod duration_serde;
pub mod identifiers;
pub mod resource;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use authorization::{AuthorizationRequest, Permission};
pub use identifiers::ConnectionId;
pub use resource::{AddressError, ResourceIdentifier};
