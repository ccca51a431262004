//! A single line in the shopping cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopcart_core::{CartItemId, ProductId};
use thiserror::Error;

/// Size recorded when the shopper did not pick one.
pub const DEFAULT_SIZE: &str = "Default";

/// Reasons a line is refused before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("at most {quantity} colors can be selected (got {selected})")]
    TooManyColors { quantity: u32, selected: usize },
}

/// A cart line as exchanged with the backend and persisted locally.
///
/// Field names on the wire follow the backend's JSON contract (`_id`,
/// `productId`, `price`, `image`, `alreadyReserved`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Server-assigned identity; `None` until the line is persisted.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub cart_item_id: Option<CartItemId>,
    pub product_id: ProductId,
    pub title: String,
    #[serde(rename = "price", with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(rename = "image", default)]
    pub image_url: String,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default)]
    pub colors: Vec<String>,
    /// Stock was already reserved by the caller; skip the reserve call.
    #[serde(default)]
    pub already_reserved: bool,
}

fn default_size() -> String {
    DEFAULT_SIZE.to_string()
}

impl CartLine {
    /// Create an unpersisted line with default size and no colors.
    #[must_use]
    pub fn new(
        product_id: impl Into<ProductId>,
        title: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            cart_item_id: None,
            product_id: product_id.into(),
            title: title.into(),
            unit_price,
            quantity,
            image_url: String::new(),
            size: default_size(),
            colors: Vec::new(),
            already_reserved: false,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    #[must_use]
    pub fn with_colors<I, C>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }

    /// Mark the line as already reserved server-side.
    #[must_use]
    pub fn reserved(mut self) -> Self {
        self.already_reserved = true;
        self
    }

    /// Price of the whole line (`unit_price * quantity`), or `None` if it
    /// does not fit a `Decimal`.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    /// Check the line before it is sent anywhere.
    ///
    /// One color may be picked per unit, so the color count is bounded by the
    /// quantity.
    ///
    /// # Errors
    ///
    /// Returns `LineError` if the quantity is zero or too many colors are set.
    pub fn validate(&self) -> Result<(), LineError> {
        if self.quantity == 0 {
            return Err(LineError::ZeroQuantity);
        }
        if self.colors.len() > self.quantity as usize {
            return Err(LineError::TooManyColors {
                quantity: self.quantity,
                selected: self.colors.len(),
            });
        }
        Ok(())
    }
}
