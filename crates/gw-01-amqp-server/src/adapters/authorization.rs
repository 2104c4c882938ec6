//! Authorization over the message bus.
//!
//! Sends an [`AuthorizationRequest`] to `authorization.in` and treats the
//! reply `"allowed"` as a grant. Every other outcome is a denial: any other
//! reply, no consumer, a dropped request or an expired deadline.

use crate::ports::AuthorizationService;
use async_trait::async_trait;
use shared_bus::RequestSender;
use shared_types::constants::{AUTHORIZATION_ADDRESS, AUTHORIZATION_ALLOWED};
use shared_types::{AuthorizationRequest, Permission, ResourceIdentifier};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct EventBusAuthorizationService {
    bus: Arc<dyn RequestSender>,
    timeout: Duration,
}

impl EventBusAuthorizationService {
    #[must_use]
    pub fn new(bus: Arc<dyn RequestSender>, timeout: Duration) -> Self {
        Self { bus, timeout }
    }
}

#[async_trait]
impl AuthorizationService for EventBusAuthorizationService {
    async fn is_authorized(
        &self,
        subject: &str,
        resource: &ResourceIdentifier,
        permission: Permission,
    ) -> bool {
        let request = AuthorizationRequest::new(subject, resource, permission);
        let body = match serde_json::to_value(&request) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Cannot encode authorization request");
                return false;
            }
        };

        match self.bus.request(AUTHORIZATION_ADDRESS, body, self.timeout).await {
            Ok(reply) => {
                let allowed = reply.as_str() == Some(AUTHORIZATION_ALLOWED);
                debug!(subject, %resource, %permission, allowed, "Authorization decision");
                allowed
            }
            Err(e) => {
                warn!(subject, %resource, %permission, error = %e, "Authorization failed, denying");
                false
            }
        }
    }
}
