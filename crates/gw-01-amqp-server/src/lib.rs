//! # AMQP Server
//!
//! Accepts AMQP 1.0 connections from devices and protocol adapters and
//! dispatches every attached link to the endpoint named by the first
//! segment of its address, after the link passed authorization.
//!
//! ## Link Attach Pipeline
//!
//! | Step | Failure | Link closed with |
//! |------|---------|------------------|
//! | remote address present | anonymous receiver | `amqp:not-found` |
//! | | anonymous sender | `amqp:decode-error` |
//! | address parses | malformed | `amqp:decode-error` |
//! | endpoint registered | unknown endpoint | `amqp:not-found` |
//! | subject authorized | denied, timed out | `amqp:unauthorized-access` |
//!
//! A rejected link never affects its connection. Authorized links are
//! handed to the endpoint, which opens them.
//!
//! ## Architecture
//!
//! - `domain`: configuration, errors, connection lifecycle
//! - `ports`: [`Endpoint`] (inbound); authorization and transport (outbound)
//! - `adapters`: [`EventBusAuthorizationService`]
//! - [`EndpointRegistry`]: name → endpoint, frozen before start
//! - [`ConnectionAcceptor`]: listeners, endpoint lifecycle, connection handling
//!
//! ## Connection Closed Events
//!
//! When a connection that was assigned an id goes away, a
//! `GatewayEvent::ConnectionClosed` is published once, whether the peer
//! closed it or the transport dropped.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod acceptor;
pub mod adapters;
pub mod domain;
pub mod ports;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use acceptor::ConnectionAcceptor;
pub use adapters::EventBusAuthorizationService;
pub use domain::{
    ConfigError, ConnectionLifecycle, ConnectionState, EndpointError, ListenerKind,
    PortConfiguration, ServerConfig, ServerError, TlsConfig, TransportError,
};
pub use ports::{
    AttachedLink, AuthorizationService, BoundListener, ClientAuth, ConnectionListener, Endpoint,
    ListenOptions, TlsOptions, TransportServer,
};
pub use registry::{EndpointRegistry, EndpointRegistryBuilder, STANDARD_ENDPOINTS};
