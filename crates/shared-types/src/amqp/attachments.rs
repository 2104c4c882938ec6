//! Per-object metadata attached to connections and links.

use crate::identifiers::ConnectionId;
use parking_lot::RwLock;

/// Metadata slot carried by a connection or a link.
///
/// The connection id is written when the connection opens and copied into
/// each accepted link, so link consumers never need the connection itself.
#[derive(Debug, Default)]
pub struct Attachments {
    connection_id: RwLock<Option<ConnectionId>>,
}

impl Attachments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        *self.connection_id.read()
    }

    pub fn set_connection_id(&self, id: ConnectionId) {
        *self.connection_id.write() = Some(id);
    }

    /// Copy the connection id (if any) from another attachment set.
    pub fn copy_connection_id_from(&self, other: &Attachments) {
        if let Some(id) = other.connection_id() {
            self.set_connection_id(id);
        }
    }
}
