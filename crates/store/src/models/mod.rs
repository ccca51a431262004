//! Domain models for the cart store.

mod cart_line;
mod session;

use std::collections::BTreeMap;

use shopcart_core::ProductId;

pub use cart_line::{CartLine, DEFAULT_SIZE, LineError};
pub use session::Session;

/// Advisory available-stock snapshot keyed by product.
///
/// Authoritative stock lives server-side; entries are created lazily on first
/// fetch and overwritten on every refresh.
pub type StockMap = BTreeMap<ProductId, i64>;
