//! Cart and stock backend access.
//!
//! # Architecture
//!
//! - [`CartBackend`] is the seam between the store and the network; the store
//!   is generic over it so tests can script responses
//! - [`HttpBackend`] talks to the storefront REST API with `reqwest`
//! - The backend owns authoritative inventory; nothing here caches

mod http;
pub mod types;

use std::future::Future;

use shopcart_core::{CartItemId, ProductId, UserId};
use thiserror::Error;

use crate::models::{CartLine, StockMap};

pub use http::HttpBackend;
pub use types::AddToCartResult;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend refused to reserve the requested stock.
    #[error("Reservation rejected: {0}")]
    Rejected(String),

    /// Client could not be set up from the configuration.
    #[error("Invalid backend configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// HTTP 404 from the backend.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// Message suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } | Self::Rejected(message) => message.clone(),
            Self::Http(_) => "Network error, please try again".to_string(),
            Self::Parse(_) | Self::Config(_) => "Unexpected response from server".to_string(),
        }
    }
}

/// Which inventory a single stock lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockTarget {
    Product,
    Accessory,
}

impl StockTarget {
    pub(crate) const fn path_segment(self) -> &'static str {
        match self {
            Self::Product => "products",
            Self::Accessory => "accessories",
        }
    }
}

/// Operations the store needs from the backend.
///
/// Every call is scoped to a user; credentials travel out of band (the
/// session cookie for [`HttpBackend`]).
pub trait CartBackend: Send + Sync {
    /// Current server-side cart contents.
    fn get_cart(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<CartLine>, BackendError>> + Send;

    /// Available stock for every product the user can see.
    fn batch_stock(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<StockMap, BackendError>> + Send;

    /// Hold `quantity` units of `product` for the user.
    ///
    /// A refusal is reported as [`BackendError::Rejected`].
    fn reserve_stock(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Persist a line to the server cart.
    fn add_to_cart(
        &self,
        user: &UserId,
        line: &CartLine,
    ) -> impl Future<Output = Result<AddToCartResult, BackendError>> + Send;

    /// Remove a persisted line; returns stock corrections.
    fn remove_from_cart(
        &self,
        user: &UserId,
        item: &CartItemId,
    ) -> impl Future<Output = Result<StockMap, BackendError>> + Send;

    /// Empty the server cart; returns updated stock figures, if any.
    fn clear_cart(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<StockMap>, BackendError>> + Send;

    /// Available stock of a single product or accessory.
    ///
    /// With `include_mine`, the user's own reservations count as available.
    fn stock(
        &self,
        user: &UserId,
        target: StockTarget,
        id: &ProductId,
        include_mine: bool,
    ) -> impl Future<Output = Result<i64, BackendError>> + Send;
}

#[cfg(test)]
pub(crate) mod fake;
