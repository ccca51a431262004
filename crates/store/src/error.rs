//! Store-level error type.
//!
//! Every failed operation surfaces one of these to the caller and, in
//! parallel, a user-facing notification. None of them leave the store
//! unusable.

use thiserror::Error;

use crate::backend::BackendError;
use crate::models::LineError;
use crate::storage::PersistError;

/// Errors returned by [`CartStore`](crate::CartStore) operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No session identity was supplied.
    #[error("Unauthenticated: no signed-in user")]
    Unauthenticated,

    /// The line was refused before any network call.
    #[error("Invalid cart line: {0}")]
    InvalidLine(#[from] LineError),

    /// The backend declined to reserve the requested quantity.
    #[error("Stock reservation rejected: {0}")]
    ReservationRejected(String),

    /// Persisting an optimistic change failed; the change was rolled back.
    #[error("Cart save failed: {0}")]
    Persistence(#[source] BackendError),

    /// A backend call failed before any local change was made.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The local blob could not be written or removed.
    #[error("Local storage error: {0}")]
    Storage(#[from] PersistError),
}

impl CartError {
    /// Classify a failed reserve-stock call.
    pub(crate) fn from_reservation(err: BackendError) -> Self {
        match err {
            BackendError::Rejected(message) => Self::ReservationRejected(message),
            other => Self::Backend(other),
        }
    }

    /// Message suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please log in to modify your cart".to_string(),
            Self::InvalidLine(err) => format!("Cannot add to cart: {err}"),
            Self::ReservationRejected(message) => message.clone(),
            Self::Persistence(err) | Self::Backend(err) => err.user_message(),
            Self::Storage(_) => "Could not update saved cart".to_string(),
        }
    }
}
