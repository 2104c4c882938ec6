//! Ports (hexagonal architecture).
//!
//! - `inbound`: what plugs into the acceptor ([`Endpoint`])
//! - `outbound`: what the acceptor relies on (authorization, transport)

pub mod inbound;
pub mod outbound;

pub use inbound::{AttachedLink, Endpoint};
pub use outbound::{
    AuthorizationService, BoundListener, ClientAuth, ConnectionListener, ListenOptions,
    TlsOptions, TransportServer,
};
