//! # Gateway Telemetry
//!
//! Logging bootstrap for processes hosting the gateway crates. The library
//! crates only emit `tracing` events; installing a subscriber is left to the
//! binary, through [`init_logging`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_logging(&config).expect("Failed to init logging");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GW_SERVICE_NAME` | `iot-gateway` | Service name attached to every log line |
//! | `GW_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directives |
//! | `GW_JSON_LOGS` | `false` (`true` in containers) | JSON formatted output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter [{directives}]: {reason}")]
    Filter { directives: String, reason: String },

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Log a connection lifecycle event with the standard fields.
///
/// ```rust,ignore
/// log_connection_event!(info, "Client connected", connection_id, remote = "mock-client");
/// ```
#[macro_export]
macro_rules! log_connection_event {
    ($level:ident, $msg:expr, $connection_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "connection",
            connection_id = %$connection_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a link event with the standard fields.
///
/// ```rust,ignore
/// log_link_event!(debug, "Link authorized", link.name(), address, subject = %subject);
/// ```
#[macro_export]
macro_rules! log_link_event {
    ($level:ident, $msg:expr, $link:expr, $address:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "link",
            link = %$link,
            address = %$address,
            $($($field)*,)?
            $msg
        )
    };
}
