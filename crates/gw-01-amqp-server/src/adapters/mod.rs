//! Adapters for the outbound ports.

pub mod authorization;

pub use authorization::EventBusAuthorizationService;
