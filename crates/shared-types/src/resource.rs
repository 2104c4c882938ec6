//! # Resource Identifier
//!
//! Structured form of an AMQP link address:
//!
//! ```text
//! <endpoint>/<tenant>/<resource-id>/<more>/...
//! ```
//!
//! In single-tenant mode the tenant segment is omitted on the wire and
//! [`DEFAULT_TENANT`](crate::constants::DEFAULT_TENANT) is injected in its
//! place, so the parsed path always has the tenant at index 1.

use crate::constants::DEFAULT_TENANT;
use std::fmt;
use thiserror::Error;

/// Address parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The address has fewer segments than the active mode requires.
    #[error("malformed address [{address}]: {segments} segment(s), at least {minimum} required")]
    MalformedAddress {
        address: String,
        segments: usize,
        minimum: usize,
    },
}

/// A parsed `/`-delimited address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier {
    path: Vec<String>,
}

impl ResourceIdentifier {
    /// Parse an address according to the tenancy mode.
    pub fn parse(address: &str, single_tenant: bool) -> Result<Self, AddressError> {
        if single_tenant {
            Self::from_string_assuming_default_tenant(address)
        } else {
            Self::from_string(address)
        }
    }

    /// Parse `<endpoint>/<tenant>[/<resource>...]`.
    pub fn from_string(address: &str) -> Result<Self, AddressError> {
        let path = split(address);
        check_segments(address, path.len(), 2)?;
        Ok(Self { path })
    }

    /// Parse `<endpoint>[/<resource>...]` and put the default tenant in
    /// the tenant position.
    pub fn from_string_assuming_default_tenant(address: &str) -> Result<Self, AddressError> {
        let mut path = split(address);
        check_segments(address, path.len(), 1)?;
        path.insert(1, DEFAULT_TENANT.to_string());
        Ok(Self { path })
    }

    /// Build an identifier from its parts.
    #[must_use]
    pub fn from_parts(endpoint: &str, tenant_id: &str, resource_id: Option<&str>) -> Self {
        let mut path = vec![endpoint.to_string(), tenant_id.to_string()];
        if let Some(id) = resource_id {
            path.push(id.to_string());
        }
        Self { path }
    }

    /// Endpoint name (segment 0).
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.path[0]
    }

    /// Tenant id (segment 1).
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.path[1]
    }

    /// Resource id, usually a device id (segment 2).
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        self.path.get(2).map(String::as_str)
    }

    /// `<endpoint>/<tenant>`
    #[must_use]
    pub fn base_path(&self) -> String {
        format!("{}/{}", self.endpoint(), self.tenant_id())
    }

    /// All segments, including the tenant.
    #[must_use]
    pub fn resource_path(&self) -> &[String] {
        &self.path
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join("/"))
    }
}

/// Split on `/`. Leading empty segments are kept, trailing ones dropped,
/// so `"telemetry/"` has one segment and `"/"` has none.
fn split(address: &str) -> Vec<String> {
    let mut path: Vec<String> = address.split('/').map(str::to_string).collect();
    if path.len() > 1 {
        while path.last().is_some_and(String::is_empty) {
            path.pop();
        }
    }
    path
}

fn check_segments(address: &str, segments: usize, minimum: usize) -> Result<(), AddressError> {
    if segments < minimum {
        return Err(AddressError::MalformedAddress {
            address: address.to_string(),
            segments,
            minimum,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_tenant() {
        let id = ResourceIdentifier::parse("telemetry/my-tenant/4711/extra", false).unwrap();
        assert_eq!(id.endpoint(), "telemetry");
        assert_eq!(id.tenant_id(), "my-tenant");
        assert_eq!(id.resource_id(), Some("4711"));
        assert_eq!(id.resource_path().len(), 4);
        assert_eq!(id.base_path(), "telemetry/my-tenant");
        assert_eq!(id.to_string(), "telemetry/my-tenant/4711/extra");
    }

    #[test]
    fn test_two_segments_is_enough() {
        let id = ResourceIdentifier::parse("registration/my-tenant", false).unwrap();
        assert_eq!(id.tenant_id(), "my-tenant");
        assert_eq!(id.resource_id(), None);
    }

    #[test]
    fn test_single_segment_rejected_in_multi_tenant_mode() {
        let err = ResourceIdentifier::parse("telemetry", false).unwrap_err();
        assert_eq!(
            err,
            AddressError::MalformedAddress {
                address: "telemetry".into(),
                segments: 1,
                minimum: 2,
            }
        );
    }

    #[test]
    fn test_single_tenant_injects_default_tenant() {
        let id = ResourceIdentifier::parse("telemetry", true).unwrap();
        assert_eq!(id.endpoint(), "telemetry");
        assert_eq!(id.tenant_id(), DEFAULT_TENANT);
        assert_eq!(id.resource_id(), None);

        let id = ResourceIdentifier::parse("telemetry/4711", true).unwrap();
        assert_eq!(id.tenant_id(), DEFAULT_TENANT);
        assert_eq!(id.resource_id(), Some("4711"));
        assert_eq!(id.to_string(), "telemetry/DEFAULT_TENANT/4711");
    }

    #[test]
    fn test_single_tenant_ignores_tenant_like_segment() {
        let id = ResourceIdentifier::parse("telemetry/other-tenant/4711", true).unwrap();
        assert_eq!(id.tenant_id(), DEFAULT_TENANT);
        assert_eq!(id.resource_id(), Some("other-tenant"));
    }

    #[test]
    fn test_slashes_are_not_normalized() {
        // leading slash: empty endpoint
        let id = ResourceIdentifier::parse("/telemetry", false).unwrap();
        assert_eq!(id.endpoint(), "");
        assert_eq!(id.tenant_id(), "telemetry");

        // inner empty segments stay
        let id = ResourceIdentifier::parse("telemetry//4711", false).unwrap();
        assert_eq!(id.tenant_id(), "");
        assert_eq!(id.resource_id(), Some("4711"));
    }

    #[test]
    fn test_trailing_slashes_are_dropped() {
        let err = ResourceIdentifier::parse("telemetry/", false).unwrap_err();
        assert_eq!(
            err,
            AddressError::MalformedAddress {
                address: "telemetry/".into(),
                segments: 1,
                minimum: 2,
            }
        );
        assert!(ResourceIdentifier::parse("telemetry//", false).is_err());
        assert!(ResourceIdentifier::parse("/", false).is_err());
        assert!(ResourceIdentifier::parse("/", true).is_err());

        let id = ResourceIdentifier::parse("telemetry/tenant/", false).unwrap();
        assert_eq!(id.resource_id(), None);
        assert_eq!(id.to_string(), "telemetry/tenant");
    }

    #[test]
    fn test_from_parts() {
        let id = ResourceIdentifier::from_parts("control", "tenant", Some("4711"));
        assert_eq!(id.to_string(), "control/tenant/4711");
        assert_eq!(
            ResourceIdentifier::from_parts("control", "tenant", None).to_string(),
            "control/tenant"
        );
    }
}
