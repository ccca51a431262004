//! In-memory storage.

use std::sync::{Mutex, PoisonError};

use super::{PersistError, PersistedState, StateStorage};

/// Holds the encoded blob in memory.
///
/// The blob still round-trips through JSON, so behaviour matches the file
/// backend. Useful for tests and for sessions that must not touch disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blob: Mutex<Option<String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing raw blob, e.g. one written by an older version.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(raw.into())),
        }
    }

    /// The raw blob currently stored.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.blob
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedState>, PersistError> {
        self.raw()
            .map(|raw| PersistedState::decode(&raw))
            .transpose()
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        let encoded = state.encode()?;
        *self.blob.lock().unwrap_or_else(PoisonError::into_inner) = Some(encoded);
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistError> {
        *self.blob.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
