//! Subcommand implementations.
//!
//! Each command builds on one [`Context`]: a store rehydrated from the
//! configured state file and talking to the configured backend. Results are
//! reported through `tracing`, as are the store's own notifications.

pub mod cart;
pub mod stock;

use shopcart_core::CurrencyCode;
use shopcart_store::{
    BackendError, CartError, CartStore, FileStorage, HttpBackend, Notification,
    NotificationLevel, Session, StoreConfig,
};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The HTTP client could not be built.
    #[error("Backend setup failed: {0}")]
    Backend(#[from] BackendError),

    /// A store operation failed.
    #[error("{0}")]
    Cart(#[from] CartError),

    /// A read operation reported failure; details were already logged.
    #[error("{0}")]
    Failed(&'static str),
}

/// Everything a command needs.
pub struct Context {
    pub store: CartStore<HttpBackend, FileStorage>,
    pub session: Option<Session>,
    pub currency: CurrencyCode,
    notifications: broadcast::Receiver<Notification>,
}

impl Context {
    /// Build the store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &StoreConfig) -> Result<Self, CliError> {
        let backend = HttpBackend::new(config)?;
        let storage = FileStorage::new(config.state_path.clone());
        let store = CartStore::new(backend, storage);
        let notifications = store.notifications();

        if config.user_id.is_none() {
            tracing::warn!("No user configured; cart operations will be refused");
        }

        Ok(Self {
            store,
            session: config.session(),
            currency: config.currency,
            notifications,
        })
    }

    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Log every notification raised since the last call.
    pub fn flush_notifications(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            match notification.level {
                NotificationLevel::Success => tracing::info!("{}", notification.message),
                NotificationLevel::Error => tracing::warn!("{}", notification.message),
            }
        }
    }
}
