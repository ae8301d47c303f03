//! Process-wide credential store.
//!
//! Every mutation replaces the whole `Session` value and writes the result
//! through the configured `SessionStorage` before releasing the session
//! lock, so memory and disk change in the same order. The in-memory change is
//! applied even when persistence fails; the failure is returned so callers
//! can decide whether it matters.

use parking_lot::RwLock;
use secrecy::SecretString;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::storage::{MemorySessionStorage, SessionStorage};
use crate::types::{Principal, Session};

/// Errors raised while persisting or restoring the session.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Writing the session blob failed.
    #[error("Failed to persist session: {0}")]
    Persist(String),

    /// Deleting the session blob failed.
    #[error("Failed to clear persisted session: {0}")]
    Clear(String),

    /// Reading the session blob failed.
    #[error("Failed to restore session: {0}")]
    Restore(String),
}

/// Owner of the current `Session`.
pub struct CredentialStore {
    session: RwLock<Session>,
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("session", &*self.session.read())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Create an empty store backed by `storage`.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            session: RwLock::new(Session::default()),
            storage,
        }
    }

    /// Create an empty store that persists only in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()))
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    /// Current bearer token, read fresh on every call.
    pub fn token(&self) -> Option<SecretString> {
        self.session.read().secret_token().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_authenticated()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.session.read().principal().cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.session.read().last_error().map(str::to_string)
    }

    /// Install a freshly authenticated session and persist it.
    pub fn set_authenticated(
        &self,
        token: SecretString,
        principal: Principal,
    ) -> Result<(), StorageError> {
        info!(principal_id = %principal.id, "Session established");
        let mut session = self.session.write();
        *session = Session::authenticated(token, principal);
        self.save(&session)
    }

    /// Swap in a re-validated principal, keeping the current token.
    ///
    /// Returns `Ok(false)` without touching anything if the token vanished in
    /// the meantime (for example a logout raced the validation call).
    pub fn replace_principal(&self, principal: Principal) -> Result<bool, StorageError> {
        let mut session = self.session.write();
        let Some(token) = session.secret_token().cloned() else {
            debug!("Token cleared during validation, keeping session cleared");
            return Ok(false);
        };
        *session = Session::authenticated(token, principal);
        self.save(&session)?;
        Ok(true)
    }

    /// Drop all credential state, optionally recording a display message,
    /// and remove the persisted blob.
    pub fn clear(&self, error: Option<String>) -> Result<(), StorageError> {
        let mut session = self.session.write();
        *session = match error {
            Some(message) => Session::cleared_with_error(message),
            None => Session::default(),
        };
        self.clear_persisted()
    }

    /// Clear only if credentials are currently held.
    ///
    /// Returns whether this call performed the clear, so that concurrent
    /// callers observe exactly one transition. The lock is held until the
    /// persisted blob is gone, so a login racing the clear is never erased
    /// from disk while it stays in memory.
    pub fn clear_if_active(&self) -> Result<bool, StorageError> {
        let mut session = self.session.write();
        if session.is_cleared() {
            return Ok(false);
        }
        *session = Session::default();
        self.clear_persisted()?;
        Ok(true)
    }

    /// Clear only the display message.
    pub fn clear_error(&self) {
        let mut session = self.session.write();
        *session = session.without_error();
    }

    /// Write the current session to storage.
    pub fn persist(&self) -> Result<(), StorageError> {
        let session = self.session.read();
        self.save(&session)
    }

    /// Write `session` through storage. Callers hold the session lock so
    /// memory and disk change together.
    fn save(&self, session: &Session) -> Result<(), StorageError> {
        self.storage.save(&session.to_persisted()).map_err(|e| {
            warn!(error = %e, "Failed to persist session");
            StorageError::Persist(e.to_string())
        })
    }

    /// Load the persisted session into memory.
    ///
    /// Returns true if a session with a token was restored. A corrupt blob
    /// leaves the store empty and is reported as an error.
    pub fn restore(&self) -> Result<bool, StorageError> {
        let persisted = self.storage.load().map_err(|e| {
            warn!(error = %e, "Failed to load persisted session");
            StorageError::Restore(e.to_string())
        })?;

        let Some(persisted) = persisted else {
            debug!("No persisted session found");
            return Ok(false);
        };

        let session = Session::from_persisted(persisted);
        let restored = session.token().is_some();
        debug!(
            restored,
            is_authenticated = session.is_authenticated(),
            "Restored persisted session"
        );
        self.replace(session);
        Ok(restored)
    }

    fn replace(&self, session: Session) {
        *self.session.write() = session;
    }

    fn clear_persisted(&self) -> Result<(), StorageError> {
        match self.storage.clear() {
            Ok(deleted) => {
                debug!(deleted, "Cleared persisted session");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear persisted session");
                Err(StorageError::Clear(e.to_string()))
            }
        }
    }
}
