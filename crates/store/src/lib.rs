//! Shopcart store library.
//!
//! A client-side mirror of the server-side cart plus an advisory cache of
//! per-product available stock. Mutations are applied optimistically for
//! instant feedback, reconciled against the authoritative backend response,
//! and compensated when the backend rejects them.
//!
//! # Architecture
//!
//! - [`backend`] - `CartBackend` trait and the `reqwest` REST implementation
//! - [`storage`] - Versioned persisted blob with load-time migration
//! - [`store`] - `CartStore`, the sole mutator of cart and stock state
//! - [`notify`] - User-facing notifications broadcast to subscribers
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shopcart_store::{CartStore, HttpBackend, FileStorage, Session, StoreConfig};
//!
//! let config = StoreConfig::from_env()?;
//! let store = Arc::new(CartStore::new(
//!     HttpBackend::new(&config)?,
//!     FileStorage::new(&config.state_path),
//! ));
//!
//! let session = Session::new("665f1c2e");
//! store.load_cart(Some(&session)).await;
//! println!("{} items", store.item_count());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod storage;
pub mod store;

pub use backend::{BackendError, CartBackend, HttpBackend, StockTarget};
pub use config::{ConfigError, StoreConfig};
pub use error::CartError;
pub use models::{CartLine, LineError, Session, StockMap};
pub use notify::{Notification, NotificationLevel};
pub use storage::{FileStorage, MemoryStorage, PersistError, PersistedState, StateStorage};
pub use store::{AddPhase, CartState, CartStore, LoadOutcome};
