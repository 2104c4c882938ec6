//! # Endpoint Registry
//!
//! Name → endpoint map, assembled by [`EndpointRegistryBuilder`] during
//! startup and frozen by [`EndpointRegistryBuilder::build`]. The acceptor
//! only ever sees the frozen [`EndpointRegistry`].

use crate::ports::Endpoint;
use shared_types::constants::{REGISTRATION_ENDPOINT, TELEMETRY_ENDPOINT};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Endpoints every gateway is expected to serve.
pub const STANDARD_ENDPOINTS: [&str; 2] = [TELEMETRY_ENDPOINT, REGISTRATION_ENDPOINT];

#[derive(Default)]
pub struct EndpointRegistryBuilder {
    endpoints: HashMap<String, Arc<dyn Endpoint>>,
    order: Vec<String>,
}

impl EndpointRegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint. A second endpoint with the same name is ignored.
    ///
    /// Returns whether the endpoint was added.
    pub fn register(&mut self, endpoint: Arc<dyn Endpoint>) -> bool {
        let name = endpoint.name().to_string();
        if self.endpoints.contains_key(&name) {
            warn!(endpoint = %name, "Multiple endpoints registered for the same name, keeping the first");
            return false;
        }
        debug!(endpoint = %name, "Registered endpoint");
        self.order.push(name.clone());
        self.endpoints.insert(name, endpoint);
        true
    }

    /// Chaining form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, endpoint: Arc<dyn Endpoint>) -> Self {
        self.register(endpoint);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<EndpointRegistry> {
        Arc::new(EndpointRegistry {
            endpoints: self.endpoints,
            order: self.order,
        })
    }
}

/// Frozen endpoint map.
pub struct EndpointRegistry {
    endpoints: HashMap<String, Arc<dyn Endpoint>>,
    order: Vec<String>,
}

impl EndpointRegistry {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Endpoint>> {
        self.endpoints.get(name).cloned()
    }

    /// Names in registration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Endpoints in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Endpoint>> {
        self.order.iter().filter_map(|name| self.endpoints.get(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Standard endpoint names without a registration.
    #[must_use]
    pub fn missing_standard_endpoints(&self) -> Vec<&'static str> {
        STANDARD_ENDPOINTS
            .into_iter()
            .filter(|name| !self.endpoints.contains_key(*name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockEndpoint;

    #[test]
    fn test_first_registration_wins() {
        let first = MockEndpoint::new("telemetry");
        let second = MockEndpoint::new("telemetry");

        let mut builder = EndpointRegistryBuilder::new();
        assert!(builder.register(first.clone()));
        assert!(!builder.register(second));
        let registry = builder.build();

        assert_eq!(registry.len(), 1);
        let found = registry.get("telemetry").unwrap();
        assert!(Arc::ptr_eq(
            &found,
            &(first as Arc<dyn Endpoint>)
        ));
    }

    #[test]
    fn test_missing_standard_endpoints() {
        let registry = EndpointRegistryBuilder::new()
            .with(MockEndpoint::new("control"))
            .build();
        assert_eq!(
            registry.missing_standard_endpoints(),
            vec!["telemetry", "registration"]
        );

        let registry = EndpointRegistryBuilder::new()
            .with(MockEndpoint::new("registration"))
            .with(MockEndpoint::new("telemetry"))
            .build();
        assert!(registry.missing_standard_endpoints().is_empty());
        assert_eq!(registry.names(), ["registration", "telemetry"]);
        assert_eq!(registry.iter().count(), 2);
    }

    #[test]
    fn test_unknown_endpoint() {
        let registry = EndpointRegistryBuilder::new().build();
        assert!(registry.is_empty());
        assert!(registry.get("telemetry").is_none());
    }
}
