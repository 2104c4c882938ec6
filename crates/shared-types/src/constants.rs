//! Well-known names and addresses.

/// Endpoint accepting telemetry data from devices.
pub const TELEMETRY_ENDPOINT: &str = "telemetry";

/// Endpoint for device registration requests.
pub const REGISTRATION_ENDPOINT: &str = "registration";

/// Endpoint carrying commands to devices and their responses.
pub const COMMAND_ENDPOINT: &str = "control";

/// Tenant assumed for every address when running in single-tenant mode.
pub const DEFAULT_TENANT: &str = "DEFAULT_TENANT";

/// Subject used for connections without an authenticated SASL principal.
pub const SUBJECT_ANONYMOUS: &str = "anonymous";

/// Bus address of the authorization service.
pub const AUTHORIZATION_ADDRESS: &str = "authorization.in";

/// Reply token meaning "access granted". Any other reply is a denial.
pub const AUTHORIZATION_ALLOWED: &str = "allowed";

/// Bus address on which connection-closed notifications are published.
pub const CONNECTION_CLOSED_ADDRESS: &str = "gateway.connection.closed";

/// IANA port for AMQP over TLS.
pub const PORT_AMQPS: u16 = 5671;

/// IANA port for plain AMQP.
pub const PORT_AMQP: u16 = 5672;
