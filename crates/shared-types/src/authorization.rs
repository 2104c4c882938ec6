//! Authorization request contract.
//!
//! The gateway asks the authorization service whether a subject may read
//! from or write to a resource. The request travels as JSON:
//!
//! ```json
//! { "auth-subject": "device-4711", "resource": "telemetry/tenant", "permission": "WRITE" }
//! ```

use crate::resource::ResourceIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access right requested for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    /// Client wants to receive messages (server-side sender link).
    Read,
    /// Client wants to send messages (server-side receiver link).
    Write,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "READ"),
            Self::Write => write!(f, "WRITE"),
        }
    }
}

/// Body of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    #[serde(rename = "auth-subject")]
    pub subject: String,
    pub resource: String,
    pub permission: Permission,
}

impl AuthorizationRequest {
    #[must_use]
    pub fn new(subject: &str, resource: &ResourceIdentifier, permission: Permission) -> Self {
        Self {
            subject: subject.to_string(),
            resource: resource.to_string(),
            permission,
        }
    }
}
