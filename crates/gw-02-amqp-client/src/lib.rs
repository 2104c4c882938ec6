//! # AMQP Client Link Establishment
//!
//! Opens sender and receiver links on an existing connection and resolves,
//! within `link_establishment_timeout`, to either the open link or a
//! classified error. A single attempt, never retried here.
//!
//! ## Resolution
//!
//! Three sources race to resolve an attempt. The first one wins and the
//! others become no-ops:
//!
//! | Event | Result |
//! |-------|--------|
//! | peer attaches | `Ok(link)`, deadline cancelled |
//! | peer refuses with a condition | `ServiceInvocationError` mapped from the condition |
//! | peer refuses without a condition | `Client { code: 404 }` |
//! | deadline expires | `Server { code: 503 }`, link opened (once), closed, freed |
//!
//! ## Architecture
//!
//! - `ports`: the [`Timer`] the deadline is scheduled on
//! - `adapters`: [`TokioTimer`]
//! - [`LinkEstablisher`]: the establishment pipeline

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod error;
pub mod establish;
pub mod ports;

mod pending;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::TokioTimer;
pub use config::{ClientConfig, ConfigError};
pub use error::{LinkError, ServiceInvocationError};
pub use establish::{CloseHook, Establishment, LinkEstablisher};
pub use ports::{Timer, TimerId, TimerTask};
