//! JSON bodies exchanged with the storefront backend.

use serde::{Deserialize, Serialize};
use shopcart_core::{ProductId, UserId};

use crate::models::{CartLine, StockMap};

/// Authoritative state returned after a line is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToCartResult {
    /// Full server cart after the add.
    pub items: Vec<CartLine>,
    /// Server-reported availability of the added product.
    pub available_stock: i64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CartItems {
    #[serde(default)]
    pub items: Vec<CartLine>,
}

/// `GET /api/cart`
#[derive(Debug, Deserialize)]
pub(crate) struct CartEnvelope {
    #[serde(default)]
    pub cart: Option<CartItems>,
}

/// `GET /api/products/stock/batch`
#[derive(Debug, Deserialize)]
pub(crate) struct StocksEnvelope {
    #[serde(default)]
    pub stocks: StockMap,
}

/// `POST /api/cart/reserve-stock`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReserveRequest<'a> {
    pub user_id: &'a UserId,
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReserveResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /api/cart/add`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddToCartRequest<'a> {
    pub user_id: &'a UserId,
    #[serde(flatten)]
    pub line: &'a CartLine,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddToCartResponse {
    pub cart: CartItems,
    pub available_stock: i64,
}

/// `DELETE /api/cart/remove/{id}` and `DELETE /api/cart/clear`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StockUpdateResponse {
    #[serde(default)]
    pub updated_stocks: Option<StockMap>,
}

/// `GET /api/{products,accessories}/stock/{id}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SingleStockResponse {
    pub available_stock: i64,
}

/// Error body: `{ "error": "..." }`, sometimes `{ "message": "..." }`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_add_request_flattens_line() {
        let user = UserId::new("u1");
        let line = CartLine::new("p1", "Tee", Decimal::from(5000), 1);
        let body = serde_json::to_value(AddToCartRequest {
            user_id: &user,
            line: &line,
        })
        .unwrap();

        assert_eq!(body["userId"], "u1");
        assert_eq!(body["productId"], "p1");
        assert_eq!(body["quantity"], 1);
    }

    #[test]
    fn test_cart_envelope_tolerates_missing_cart() {
        let env: CartEnvelope = serde_json::from_str("{}").unwrap();
        assert!(env.cart.is_none());

        let env: CartEnvelope = serde_json::from_str(r#"{"cart":{}}"#).unwrap();
        assert!(env.cart.unwrap().items.is_empty());
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"Insufficient stock"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Insufficient stock"));

        let body: ErrorBody = serde_json::from_str(r#"{"message":"Cart not found"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Cart not found"));

        let body: ErrorBody = serde_json::from_str(r#"{"error":"  "}"#).unwrap();
        assert_eq!(body.into_message(), None);
    }
}
