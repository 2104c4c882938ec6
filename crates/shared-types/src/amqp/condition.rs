//! AMQP error conditions and delivery outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `amqp:not-found`
pub const NOT_FOUND: &str = "amqp:not-found";
/// `amqp:unauthorized-access`
pub const UNAUTHORIZED_ACCESS: &str = "amqp:unauthorized-access";
/// `amqp:resource-limit-exceeded`
pub const RESOURCE_LIMIT_EXCEEDED: &str = "amqp:resource-limit-exceeded";
/// `amqp:internal-error`
pub const INTERNAL_ERROR: &str = "amqp:internal-error";
/// `amqp:decode-error`
pub const DECODE_ERROR: &str = "amqp:decode-error";
/// `amqp:precondition-failed`
pub const PRECONDITION_FAILED: &str = "amqp:precondition-failed";
/// `amqp:not-allowed`
pub const NOT_ALLOWED: &str = "amqp:not-allowed";
/// `amqp:not-implemented`
pub const NOT_IMPLEMENTED: &str = "amqp:not-implemented";
/// Gateway specific: the request was malformed.
pub const BAD_REQUEST: &str = "gateway:bad-request";

/// Error condition attached to a closing link, session or connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCondition {
    pub condition: String,
    pub description: Option<String>,
}

impl ErrorCondition {
    #[must_use]
    pub fn new(condition: &str, description: impl Into<String>) -> Self {
        Self {
            condition: condition.to_string(),
            description: Some(description.into()),
        }
    }

    /// A condition without description.
    #[must_use]
    pub fn bare(condition: &str) -> Self {
        Self {
            condition: condition.to_string(),
            description: None,
        }
    }
}

impl fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.condition, description),
            None => write!(f, "{}", self.condition),
        }
    }
}

/// Outcome of a transfer, sent back with a disposition frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    Accepted,
    Rejected(Option<ErrorCondition>),
    Released,
    Modified {
        delivery_failed: bool,
        undeliverable_here: bool,
    },
}

impl DeliveryState {
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
