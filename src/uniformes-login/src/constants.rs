//! Constants for the uniformes-login crate.

/// Storage key the session blob is persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "admin-auth-storage";

/// Name of the per-user data directory (under the home directory).
pub const DATA_DIR_NAME: &str = ".uniformes";

/// Environment variable overriding the data directory.
pub const HOME_ENV_VAR: &str = "UNIFORMES_HOME";
