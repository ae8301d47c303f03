//! Uniformes Login - session state for the Uniformes API client.
//!
//! Holds the authenticated principal and bearer token for the current
//! process and persists them so a restart can silently restore the session:
//! - `Session` / `Principal` data model
//! - `CredentialStore`, the process-wide owner of the session
//! - File and in-memory persistence backends
//!
//! Network-bearing operations (login, session validation) live in the
//! gateway crate, which shares a `CredentialStore` with the request path.

// Core modules
pub mod constants;
pub mod types;
mod utils;

// Persistence backends
pub mod storage;

// High-level API
mod store;

// Re-exports from constants
pub use constants::{DATA_DIR_NAME, DEFAULT_STORAGE_KEY, HOME_ENV_VAR};

// Re-exports from types
pub use types::{PersistedSession, Principal, ScopedRole, Session};

// Re-exports from storage
pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage};

// Re-exports from store
pub use store::{CredentialStore, StorageError};

// Re-exports from utils
pub use utils::{default_data_dir, mask_token};
