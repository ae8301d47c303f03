//! Constants for the uniformes-gateway crate.

/// Built-in backend address used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding the backend address.
pub const API_URL_ENV_VAR: &str = "UNIFORMES_API_URL";

/// Version prefix inserted between the base address and every endpoint path.
pub const API_PREFIX: &str = "/api/v1";

/// Health probe path, outside the versioned prefix.
pub const HEALTH_PATH: &str = "/health";

/// Login endpoint (JSON `{username, password}`).
pub const LOGIN_PATH: &str = "/auth/login";

/// Session validation endpoint.
pub const ME_PATH: &str = "/auth/me";

/// UI location of the login surface.
pub const LOGIN_ROUTE: &str = "/login";
