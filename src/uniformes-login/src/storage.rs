//! Durable session storage backends.
//!
//! The session blob is a single JSON document written under a fixed storage
//! key. Two backends are provided:
//! - `FileSessionStorage`: `<data dir>/<key>.json` with 0600 permissions
//! - `MemorySessionStorage`: process-local, used by embedders and tests

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::PersistedSession;
use crate::utils::set_file_permissions;

/// A place the session blob can be saved to and restored from.
pub trait SessionStorage: Send + Sync {
    /// Load the persisted session, if one exists.
    fn load(&self) -> Result<Option<PersistedSession>>;

    /// Replace the persisted session.
    fn save(&self, session: &PersistedSession) -> Result<()>;

    /// Remove the persisted session. Returns true if something was deleted.
    fn clear(&self) -> Result<bool>;
}

/// JSON file storage under the data directory.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    /// Storage for `key` inside `data_dir`.
    pub fn new(data_dir: &Path, key: &str) -> Self {
        Self {
            path: data_dir.join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;

        let session: PersistedSession =
            serde_json::from_str(&content).context("Failed to parse persisted session")?;

        Ok(Some(session))
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(session).context("Failed to serialize session data")?;

        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;

        set_file_permissions(&self.path)?;

        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(&self.path)
            .with_context(|| format!("Failed to delete session file: {}", self.path.display()))?;

        Ok(true)
    }
}

/// In-memory storage. Keeps the serialized blob so callers can inspect
/// exactly what would have been written, and counts writes and clears.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    blob: Mutex<Option<String>>,
    saves: AtomicUsize,
    clears: AtomicUsize,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a session, as if written by an earlier run.
    pub fn with_session(session: &PersistedSession) -> Result<Self> {
        let storage = Self::new();
        *storage.blob.lock() = Some(serde_json::to_string(session)?);
        Ok(storage)
    }

    /// The raw persisted JSON, if any.
    pub fn raw(&self) -> Option<String> {
        self.blob.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        match self.blob.lock().as_deref() {
            Some(raw) => Ok(Some(
                serde_json::from_str(raw).context("Failed to parse persisted session")?,
            )),
            None => Ok(None),
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        let raw = serde_json::to_string(session).context("Failed to serialize session data")?;
        *self.blob.lock() = Some(raw);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(self.blob.lock().take().is_some())
    }
}
