//! Adapters for the outbound ports.

mod tokio_timer;

pub use tokio_timer::TokioTimer;
