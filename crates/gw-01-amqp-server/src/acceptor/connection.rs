//! Event handler installed on every accepted connection.

use super::attach::{handle_attach, Direction};
use super::{AcceptorCore, ContainerName};
use crate::domain::ConnectionLifecycle;
use crate::ports::AttachedLink;
use gateway_telemetry::log_connection_event;
use parking_lot::Mutex;
use shared_bus::GatewayEvent;
use shared_types::amqp::{
    Connection, ConnectionEventHandler, EngineError, ReceiverLink, SenderLink, Session,
};
use shared_types::ConnectionId;
use std::sync::Arc;
use tracing::{debug, info};

pub(crate) struct ConnectionHandler {
    core: Arc<AcceptorCore>,
    container: ContainerName,
    lifecycle: Mutex<ConnectionLifecycle>,
}

impl ConnectionHandler {
    pub(crate) fn new(core: Arc<AcceptorCore>, container: ContainerName) -> Self {
        Self {
            core,
            container,
            lifecycle: Mutex::new(ConnectionLifecycle::new()),
        }
    }

    /// Publish the closed event, once per connection.
    fn announce_closed(&self) {
        let Some(connection_id) = self.lifecycle.lock().closed() else {
            return;
        };
        log_connection_event!(info, "Connection closed", connection_id);
        let publisher = self.core.publisher.clone();
        self.core.runtime.spawn(async move {
            let receivers = publisher
                .publish(GatewayEvent::ConnectionClosed { connection_id })
                .await;
            debug!(%connection_id, receivers, "Published connection closed event");
        });
    }
}

impl ConnectionEventHandler for ConnectionHandler {
    fn on_remote_open(&self, connection: Arc<dyn Connection>) {
        let connection_id = ConnectionId::new();
        if !self.lifecycle.lock().opened(connection_id) {
            debug!("Ignoring repeated open");
            return;
        }
        connection.attachments().set_connection_id(connection_id);
        connection.set_container(self.container.render());
        log_connection_event!(
            info,
            "Client connected",
            connection_id,
            remote_container = connection.remote_container().as_deref().unwrap_or("unknown"),
            subject = connection.authenticated_subject().as_deref().unwrap_or("none")
        );
        connection.open();
    }

    fn on_session_open(&self, _connection: Arc<dyn Connection>, session: Arc<dyn Session>) {
        let weak = Arc::downgrade(&session);
        session.on_remote_close(Box::new(move |_| {
            if let Some(session) = weak.upgrade() {
                session.close();
            }
        }));
        session.open();
    }

    fn on_receiver_open(&self, connection: Arc<dyn Connection>, receiver: Arc<dyn ReceiverLink>) {
        handle_attach(
            &self.core,
            &*connection,
            receiver,
            Direction::INBOUND,
            AttachedLink::Receiver,
        );
    }

    fn on_sender_open(&self, connection: Arc<dyn Connection>, sender: Arc<dyn SenderLink>) {
        handle_attach(
            &self.core,
            &*connection,
            sender,
            Direction::OUTBOUND,
            AttachedLink::Sender,
        );
    }

    fn on_remote_close(&self, connection: Arc<dyn Connection>, result: Result<(), EngineError>) {
        if !self.lifecycle.lock().closing() {
            return;
        }
        match &result {
            Ok(()) => info!("Client closed connection"),
            Err(e) => info!(error = %e, "Client closed connection with error"),
        }
        connection.close();
        connection.disconnect();
        self.announce_closed();
    }

    fn on_disconnect(&self, connection: Arc<dyn Connection>) {
        info!("Client disconnected");
        connection.disconnect();
        self.announce_closed();
    }
}
