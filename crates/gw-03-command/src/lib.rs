//! # Command Parsing
//!
//! Turns a message received on the command endpoint into a [`Command`]:
//! a validated, immutable descriptor naming the command, its correlation id
//! and the reply-to id under which the device's response is routed back.
//!
//! ## Reply-to format
//!
//! ```text
//! control/<tenant>/<device-id>/<reply-id>...
//! ```
//!
//! The tenant and device segments must match the device the command was
//! addressed to. The reply-to id is everything after the tenant, so it
//! starts with the device id.
//!
//! Invalid messages are rejected on the spot with a settled `Rejected`
//! disposition. The caller still gets a `Command` and branches on
//! [`Command::is_valid`].

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod command;
mod error;

pub use command::Command;
pub use error::InvalidCommand;
