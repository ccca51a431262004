//! Durable local persistence of cart state.
//!
//! The cart lines and the stock cache are written together as one named blob
//! ([`STORAGE_KEY`]) after every state change and read back when the store is
//! created. The blob carries an explicit schema version; older layouts are
//! migrated at load time (see [`migrate`]).

mod file;
mod memory;
pub mod migrate;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CartLine, StockMap};

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Name of the persisted blob.
pub const STORAGE_KEY: &str = "cart-storage";

/// Schema version written by this crate.
pub const CURRENT_VERSION: u32 = 1;

/// Errors from reading or writing the persisted blob.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cart blob: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported cart blob version {found}")]
    UnsupportedVersion { found: u64 },
}

/// The on-disk shape of the cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub stocks: StockMap,
}

impl PersistedState {
    /// Snapshot for writing, stamped with the current time.
    #[must_use]
    pub fn new(lines: Vec<CartLine>, stocks: StockMap) -> Self {
        Self {
            version: CURRENT_VERSION,
            saved_at: Some(Utc::now()),
            lines,
            stocks,
        }
    }

    /// Encode as the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a blob of any known version, migrating it to the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is not JSON, does not match its declared
    /// layout, or declares a version newer than this crate understands.
    pub fn decode(raw: &str) -> Result<Self, PersistError> {
        migrate::decode(raw)
    }
}

/// Durable key-value slot holding the persisted blob.
///
/// Calls are synchronous and short; the store invokes them while applying a
/// state change so that writes land in the same order as the changes.
pub trait StateStorage: Send + Sync {
    /// Read the blob, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be read or decoded.
    fn load(&self) -> Result<Option<PersistedState>, PersistError>;

    /// Replace the blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be encoded or written.
    fn save(&self, state: &PersistedState) -> Result<(), PersistError>;

    /// Delete the blob. Deleting a missing blob is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be removed.
    fn clear(&self) -> Result<(), PersistError>;
}

impl<T: StateStorage + ?Sized> StateStorage for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<PersistedState>, PersistError> {
        (**self).load()
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        (**self).save(state)
    }

    fn clear(&self) -> Result<(), PersistError> {
        (**self).clear()
    }
}
