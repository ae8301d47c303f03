//! HTTP client factory for the gateway.
//!
//! Provides factory functions so every client shares the same settings:
//! - `create_default_client()` - 60s timeout, long enough for uploads
//! - `create_health_check_client()` - 5s timeout for reachability probes
//! - `create_client_with_timeout(duration)` - Custom timeout
//!
//! All clients include: User-Agent, tcp_nodelay and a bounded idle pool.

use reqwest::Client;
use std::time::Duration;

/// User-Agent string for all HTTP requests
pub const USER_AGENT: &str = concat!("uniformes/", env!("CARGO_PKG_VERSION"));

/// Overall timeout per call. Exceeding it is reported as unreachable.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Short timeout for health checks (5 seconds)
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle connections are dropped after this long so a changed backend
/// address or DNS record is picked up.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates an HTTP client with default configuration (60s timeout).
pub fn create_default_client() -> Result<Client, String> {
    create_client_with_timeout(DEFAULT_TIMEOUT)
}

/// Creates an HTTP client for health checks (5s timeout).
pub fn create_health_check_client() -> Result<Client, String> {
    create_client_with_timeout(HEALTH_CHECK_TIMEOUT)
}

/// Creates an HTTP client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client, String> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .tcp_nodelay(true)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {e}"))
}
