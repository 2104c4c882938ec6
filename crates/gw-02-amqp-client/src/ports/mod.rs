//! Outbound dependencies of the link establisher.

mod timer;

pub use timer::{Timer, TimerId, TimerTask};
