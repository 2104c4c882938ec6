//! # Connection Acceptor
//!
//! Owns the listeners, starts and stops the endpoints, and runs every
//! accepted connection through [`connection::ConnectionHandler`].
//!
//! ## Startup
//!
//! 1. Warn about missing standard endpoints
//! 2. Resolve the ports ([`PortConfiguration::determine`])
//! 3. Start all endpoints concurrently; the first failure aborts startup
//! 4. Bind the secure listener, then the insecure one
//!
//! A failed start leaves nothing behind: bound listeners are closed and
//! endpoints that did start are stopped again.
//!
//! ## Shutdown
//!
//! Listeners are closed first so no new connections arrive, then every
//! endpoint is stopped concurrently. The first stop failure is reported
//! after all stops have run.

mod attach;
mod connection;

#[cfg(test)]
mod tests;

use crate::domain::{
    EndpointError, ListenerKind, PortConfiguration, ServerConfig, ServerError,
};
use crate::ports::{
    AuthorizationService, BoundListener, ConnectionListener, Endpoint, ListenOptions,
    TransportServer,
};
use crate::registry::EndpointRegistry;
use connection::ConnectionHandler;
use futures::future::join_all;
use parking_lot::Mutex;
use shared_bus::EventPublisher;
use shared_types::amqp::Connection;
use shared_types::constants::{PORT_AMQP, PORT_AMQPS};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Shared by all connections of one acceptor run.
pub(crate) struct AcceptorCore {
    pub(crate) registry: Arc<EndpointRegistry>,
    pub(crate) authorization: Arc<dyn AuthorizationService>,
    pub(crate) publisher: Arc<dyn EventPublisher>,
    pub(crate) single_tenant: bool,
    /// Runtime that authorization checks and event publishing run on.
    pub(crate) runtime: Handle,
}

/// `<service>-<bind address>:<port>`, port filled in once bound.
#[derive(Clone)]
pub(crate) struct ContainerName {
    service: String,
    bind_address: String,
    port: Arc<AtomicU16>,
}

impl ContainerName {
    pub(crate) fn render(&self) -> String {
        format!(
            "{}-{}:{}",
            self.service,
            self.bind_address,
            self.port.load(Ordering::Acquire)
        )
    }
}

struct ListenerContext {
    core: Arc<AcceptorCore>,
    container: ContainerName,
}

impl ConnectionListener for ListenerContext {
    fn on_connection(&self, connection: Arc<dyn Connection>) {
        debug!(
            remote_container = connection.remote_container().as_deref().unwrap_or("unknown"),
            "Accepted connection"
        );
        let handler = ConnectionHandler::new(self.core.clone(), self.container.clone());
        connection.set_event_handler(Arc::new(handler));
    }
}

/// The AMQP server.
pub struct ConnectionAcceptor {
    config: ServerConfig,
    registry: Arc<EndpointRegistry>,
    authorization: Arc<dyn AuthorizationService>,
    publisher: Arc<dyn EventPublisher>,
    transport: Arc<dyn TransportServer>,
    started: AtomicBool,
    secure: Mutex<Option<Box<dyn BoundListener>>>,
    insecure: Mutex<Option<Box<dyn BoundListener>>>,
}

impl ConnectionAcceptor {
    pub fn new(
        config: ServerConfig,
        registry: Arc<EndpointRegistry>,
        authorization: Arc<dyn AuthorizationService>,
        publisher: Arc<dyn EventPublisher>,
        transport: Arc<dyn TransportServer>,
    ) -> Self {
        Self {
            config,
            registry,
            authorization,
            publisher,
            transport,
            started: AtomicBool::new(false),
            secure: Mutex::new(None),
            insecure: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// Port the secure listener is bound to.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.secure.lock().as_ref().map(|l| l.local_port())
    }

    /// Port the insecure listener is bound to.
    #[must_use]
    pub fn insecure_port(&self) -> Option<u16> {
        self.insecure.lock().as_ref().map(|l| l.local_port())
    }

    /// Start endpoints and bind listeners.
    ///
    /// Must be called from within a tokio runtime. A failed start is rolled
    /// back, so the acceptor may be started again.
    pub async fn start(&self) -> Result<(), ServerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }
        let result = self.start_inner().await;
        if result.is_err() {
            self.started.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn start_inner(&self) -> Result<(), ServerError> {
        for name in self.registry.missing_standard_endpoints() {
            warn!(endpoint = name, "No endpoint registered for standard address");
        }
        let ports = PortConfiguration::determine(&self.config)?;

        self.start_endpoints().await?;

        let core = Arc::new(AcceptorCore {
            registry: self.registry.clone(),
            authorization: self.authorization.clone(),
            publisher: self.publisher.clone(),
            single_tenant: self.config.single_tenant,
            runtime: Handle::current(),
        });

        if let Err(e) = self.bind_listeners(&core, ports).await {
            self.close_listeners().await;
            stop_endpoints(self.registry.iter().cloned()).await;
            return Err(e);
        }
        Ok(())
    }

    /// Start every endpoint. If one fails, the ones that did start are
    /// stopped again before the first failure is returned.
    async fn start_endpoints(&self) -> Result<(), ServerError> {
        let starts = self.registry.iter().map(|endpoint| {
            let endpoint = endpoint.clone();
            let name = endpoint.name().to_string();
            // spawned so a failing sibling does not cancel the others
            let task = tokio::spawn({
                let endpoint = endpoint.clone();
                async move { endpoint.start().await }
            });
            async move {
                let result = match task.await {
                    Ok(Ok(())) => {
                        debug!(endpoint = %name, "Endpoint started");
                        Ok(())
                    }
                    Ok(Err(source)) => Err(ServerError::EndpointStart { name, source }),
                    Err(e) => Err(ServerError::EndpointStart {
                        name,
                        source: EndpointError::Aborted(e.to_string()),
                    }),
                };
                (endpoint, result)
            }
        });

        let mut started = Vec::new();
        let mut first_error = None;
        for (endpoint, result) in join_all(starts).await {
            match result {
                Ok(()) => started.push(endpoint),
                Err(e) => {
                    error!(error = %e, "Cannot start endpoint");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            stop_endpoints(started).await;
            return Err(e);
        }
        info!(endpoints = self.registry.len(), "Endpoints started");
        Ok(())
    }

    async fn bind_listeners(
        &self,
        core: &Arc<AcceptorCore>,
        ports: PortConfiguration,
    ) -> Result<(), ServerError> {
        if let Some(port) = ports.secure {
            let options = ListenOptions::secure(&self.config, port);
            let bound = self.bind(core, ListenerKind::Secure, options).await?;
            *self.secure.lock() = Some(bound);
        }
        if let Some(port) = ports.insecure {
            let options = ListenOptions::insecure(&self.config, port);
            let bound = self.bind(core, ListenerKind::Insecure, options).await?;
            *self.insecure.lock() = Some(bound);
        }
        Ok(())
    }

    async fn bind(
        &self,
        core: &Arc<AcceptorCore>,
        kind: ListenerKind,
        options: ListenOptions,
    ) -> Result<Box<dyn BoundListener>, ServerError> {
        let address = options.bind_address.clone();
        let requested = options.port;
        let port = Arc::new(AtomicU16::new(requested));
        let context = Arc::new(ListenerContext {
            core: core.clone(),
            container: ContainerName {
                service: self.config.service_name.clone(),
                bind_address: address.clone(),
                port: port.clone(),
            },
        });

        let bound = self
            .transport
            .listen(options, context)
            .await
            .map_err(|source| {
                error!(%kind, %address, port = requested, error = %source, "Cannot bind listener");
                ServerError::Bind { kind, source }
            })?;

        let actual = bound.local_port();
        port.store(actual, Ordering::Release);
        let standard = match kind {
            ListenerKind::Secure => PORT_AMQPS,
            ListenerKind::Insecure => PORT_AMQP,
        };
        if actual != standard {
            warn!(%kind, port = actual, standard, "Listener bound to non-standard port");
        }
        info!(%kind, %address, port = actual, "Listening for AMQP connections");
        Ok(bound)
    }

    async fn close_listeners(&self) {
        let secure = self.secure.lock().take();
        let insecure = self.insecure.lock().take();
        for (kind, listener) in [
            (ListenerKind::Secure, secure),
            (ListenerKind::Insecure, insecure),
        ] {
            if let Some(listener) = listener {
                listener.close().await;
                info!(%kind, "Listener closed");
            }
        }
    }

    /// Close listeners, then stop all endpoints.
    pub async fn stop(&self) -> Result<(), ServerError> {
        self.close_listeners().await;
        let first_error = stop_endpoints(self.registry.iter().cloned()).await;
        self.started.store(false, Ordering::SeqCst);

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Server stopped");
                Ok(())
            }
        }
    }
}

/// Stop `endpoints` concurrently and return the first failure.
async fn stop_endpoints(
    endpoints: impl IntoIterator<Item = Arc<dyn Endpoint>>,
) -> Option<ServerError> {
    let stops = endpoints.into_iter().map(|endpoint| async move {
        let result = endpoint.stop().await;
        (endpoint.name().to_string(), result)
    });

    let mut first_error = None;
    for (name, result) in join_all(stops).await {
        if let Err(source) = result {
            warn!(endpoint = %name, error = %source, "Endpoint failed to stop");
            first_error.get_or_insert(ServerError::EndpointStop { name, source });
        }
    }
    first_error
}
