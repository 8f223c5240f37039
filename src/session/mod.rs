pub mod storage;

pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

use crate::data::CanonicalRecord;
use tracing::{debug, warn};

/// Normalized records kept for the rest of the browsing session.
#[derive(Debug)]
pub struct SessionCache<S: SessionStorage> {
    storage: S,
    key: String,
}

impl<S: SessionStorage> SessionCache<S> {
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persists the records, returning whether the write landed.
    ///
    /// Failures are logged only: the caller still holds the records in memory.
    pub fn store(&self, records: &[CanonicalRecord]) -> bool {
        let payload = match serde_json::to_string(records) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to serialize session snapshot");
                return false;
            }
        };
        match self.storage.set(&self.key, &payload) {
            Ok(()) => {
                debug!(key = %self.key, records = records.len(), "session snapshot stored");
                true
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "session storage write failed");
                false
            }
        }
    }

    /// Previously stored records; unreadable or corrupt snapshots count as absent.
    pub fn load(&self) -> Option<Vec<CanonicalRecord>> {
        let payload = match self.storage.get(&self.key) {
            Ok(payload) => payload?,
            Err(e) => {
                warn!(key = %self.key, error = %e, "session storage read failed");
                return None;
            }
        };
        match serde_json::from_str(&payload) {
            Ok(records) => Some(records),
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding corrupt session snapshot");
                None
            }
        }
    }

    /// Drops the snapshot, as happens when the session ends.
    pub fn end_session(&self) -> storage::Result<()> {
        self.storage.remove(&self.key)
    }
}
