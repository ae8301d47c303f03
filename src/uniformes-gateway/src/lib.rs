//! Uniformes Gateway - credential-aware HTTP access to the Uniformes API.
//!
//! Every domain service talks to the backend through one `Gateway`:
//! - Injects the bearer token held by the shared `CredentialStore`
//! - Reports each call's reachability to the `ConnectivityTracker`
//! - Classifies failures into `GatewayError` / `FailureKind`
//! - Runs the `SessionGuard` on 401 so a rejected token is dropped once
//! - `to_display_message` turns any failure into Spanish UI text
//!
//! `AuthClient` layers login, logout and session validation on top.

// Core modules
pub mod constants;
pub mod detail;
pub mod error;
pub mod http_client;

// Configuration
pub mod config;

// Request path
pub mod connectivity;
pub mod gateway;
pub mod guard;
pub mod normalize;
pub mod request;

// High-level API
pub mod auth;

// Re-exports from error
pub use error::{FailureKind, GatewayError, GatewayResult};

// Re-exports from detail
pub use detail::{ErrorDetail, FieldError, LocationSegment};

// Re-exports from config
pub use config::{ApiEndpoint, ClientConfig, ConfigError};

// Re-exports from the request path
pub use connectivity::{ConnectivityState, ConnectivityTracker};
pub use gateway::{Gateway, GatewayBuilder, HealthPoller};
pub use guard::{LoggingNavigator, Navigator, SessionGuard};
pub use normalize::{display_message_for, to_display_message};
pub use request::{ApiResponse, MultipartBody, RequestBody, RequestOptions, UploadFile};

// Re-exports from auth
pub use auth::{AuthClient, MSG_ACCESS_DENIED};

pub use reqwest::Method;
