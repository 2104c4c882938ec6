//! The attach pipeline shared by both link directions.
//!
//! ```text
//! remote address ─▶ parse ─▶ endpoint lookup ─▶ authorize ─▶ endpoint.on_link_attach
//!       │             │            │                │
//!   anonymous     decode-error  not-found   unauthorized-access
//! ```

use super::AcceptorCore;
use crate::ports::AttachedLink;
use gateway_telemetry::log_link_event;
use shared_types::amqp::condition::{DECODE_ERROR, NOT_FOUND, UNAUTHORIZED_ACCESS};
use shared_types::amqp::{Connection, ErrorCondition, Link};
use shared_types::constants::SUBJECT_ANONYMOUS;
use shared_types::{Permission, ResourceIdentifier};
use std::sync::Arc;
use tracing::{debug, warn};

/// What differs between a client sending and a client receiving.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Direction {
    pub(crate) permission: Permission,
    /// Terminus carrying the address ("target" or "source").
    pub(crate) terminus: &'static str,
    /// "to" or "from", used in the denial message.
    pub(crate) preposition: &'static str,
    /// Condition for a link without remote address.
    pub(crate) anonymous: fn() -> ErrorCondition,
}

impl Direction {
    /// Client sends, server receives.
    pub(crate) const INBOUND: Self = Self {
        permission: Permission::Write,
        terminus: "target",
        preposition: "to",
        anonymous: anonymous_relay,
    };

    /// Client receives, server sends.
    pub(crate) const OUTBOUND: Self = Self {
        permission: Permission::Read,
        terminus: "source",
        preposition: "from",
        anonymous: missing_source,
    };
}

fn anonymous_relay() -> ErrorCondition {
    ErrorCondition::new(NOT_FOUND, "anonymous relay not supported")
}

fn missing_source() -> ErrorCondition {
    ErrorCondition::new(DECODE_ERROR, "link has no source address")
}

/// Run a newly attached link through the pipeline.
///
/// Every rejection only closes this link; the connection and its other
/// links are untouched.
pub(crate) fn handle_attach<L>(
    core: &Arc<AcceptorCore>,
    connection: &dyn Connection,
    link: Arc<L>,
    direction: Direction,
    into_attached: fn(Arc<L>) -> AttachedLink,
) where
    L: Link + ?Sized + 'static,
{
    let Some(address) = link.remote_address() else {
        debug!(link = %link.name(), terminus = direction.terminus, "Rejecting link without address");
        reject(&*link, (direction.anonymous)());
        return;
    };

    let resource = match ResourceIdentifier::parse(&address, core.single_tenant) {
        Ok(resource) => resource,
        Err(e) => {
            log_link_event!(debug, "Rejecting link with malformed address", link.name(), address, error = %e);
            reject(&*link, ErrorCondition::new(DECODE_ERROR, e.to_string()));
            return;
        }
    };

    let Some(endpoint) = core.registry.get(resource.endpoint()) else {
        log_link_event!(debug, "No endpoint for address", link.name(), address);
        reject(
            &*link,
            ErrorCondition::new(NOT_FOUND, format!("no endpoint registered for address {address}")),
        );
        return;
    };

    let subject = connection.authenticated_subject().unwrap_or_else(|| {
        warn!(link = %link.name(), "Connection has no authenticated principal, using anonymous");
        SUBJECT_ANONYMOUS.to_string()
    });
    // read before spawning, the task holds no connection
    let connection_id = connection.attachments().connection_id();
    let authorization = core.authorization.clone();

    core.runtime.spawn(async move {
        let permission = direction.permission;
        if authorization
            .is_authorized(&subject, &resource, permission)
            .await
        {
            if let Some(id) = connection_id {
                link.attachments().set_connection_id(id);
            }
            link.set_local_address(Some(address));
            log_link_event!(
                debug,
                "Link authorized",
                link.name(),
                resource,
                %subject,
                %permission,
                endpoint = endpoint.name()
            );
            endpoint.on_link_attach(into_attached(link), resource);
        } else {
            log_link_event!(debug, "Link not authorized", link.name(), resource, %subject, %permission);
            let message = format!(
                "subject [{subject}] is not authorized to {permission} {} [{resource}]",
                direction.preposition
            );
            reject(&*link, ErrorCondition::new(UNAUTHORIZED_ACCESS, message));
        }
    });
}

fn reject<L: Link + ?Sized>(link: &L, condition: ErrorCondition) {
    link.set_condition(Some(condition));
    link.close();
}
