//! Per-connection lifecycle.
//!
//! ```text
//! Opening ──remote open──▶ Open ──remote close──▶ Closing ──▶ Closed
//!    │                      │                                  ▲
//!    └──────────────────────┴────────── disconnect ────────────┘
//! ```
//!
//! The transition into `Closed` happens once. It hands out the connection id
//! (if one was assigned), so the closed notification is published once even
//! when both the close and the disconnect path run.

use shared_types::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Opening,
    Open,
    Closing,
    Closed,
}

#[derive(Debug)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    connection_id: Option<ConnectionId>,
}

impl ConnectionLifecycle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Opening,
            connection_id: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id
    }

    /// Record the id assigned on remote open. Ignored unless `Opening`.
    pub fn opened(&mut self, id: ConnectionId) -> bool {
        if self.state != ConnectionState::Opening {
            return false;
        }
        self.state = ConnectionState::Open;
        self.connection_id = Some(id);
        true
    }

    /// The peer sent close. Returns false if already closing or closed.
    pub fn closing(&mut self) -> bool {
        match self.state {
            ConnectionState::Opening | ConnectionState::Open => {
                self.state = ConnectionState::Closing;
                true
            }
            ConnectionState::Closing | ConnectionState::Closed => false,
        }
    }

    /// Enter `Closed`. Returns the id to announce, only on the first call.
    pub fn closed(&mut self) -> Option<ConnectionId> {
        if self.state == ConnectionState::Closed {
            return None;
        }
        self.state = ConnectionState::Closed;
        self.connection_id
    }
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
