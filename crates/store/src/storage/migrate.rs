//! Load-time schema migration for the persisted cart blob.
//!
//! # Versions
//!
//! - `0` - unversioned browser layout written by the legacy web storefront:
//!   `{ "state": { "cartItems": [...], "productStocks": {...} }, "version": 0 }`.
//!   Stock values there could be `null` or fractional; only integral,
//!   non-negative figures are kept.
//! - `1` - `{ "version": 1, "savedAt"?: ..., "lines": [...], "stocks": {...} }`

use serde::Deserialize;
use serde_json::Value;
use shopcart_core::ProductId;
use tracing::{debug, warn};

use super::{CURRENT_VERSION, PersistError, PersistedState};
use crate::models::{CartLine, StockMap};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyState {
    #[serde(default)]
    cart_items: Option<Vec<CartLine>>,
    #[serde(default)]
    product_stocks: Option<serde_json::Map<String, Value>>,
}

/// Decode a blob of any known version into the current layout.
pub(super) fn decode(raw: &str) -> Result<PersistedState, PersistError> {
    let value: Value = serde_json::from_str(raw)?;
    let version = value.get("version").and_then(Value::as_u64).unwrap_or(0);

    match version {
        0 => {
            debug!("Migrating unversioned cart blob");
            migrate_v0(value)
        }
        v if v == u64::from(CURRENT_VERSION) => Ok(serde_json::from_value(value)?),
        found => Err(PersistError::UnsupportedVersion { found }),
    }
}

fn migrate_v0(mut value: Value) -> Result<PersistedState, PersistError> {
    let state = value
        .get_mut("state")
        .map(Value::take)
        .unwrap_or(Value::Null);

    let legacy: LegacyState = if state.is_null() {
        LegacyState {
            cart_items: None,
            product_stocks: None,
        }
    } else {
        serde_json::from_value(state)?
    };

    let stocks: StockMap = legacy
        .product_stocks
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(id, n)| match n.as_i64() {
            Some(n) if n >= 0 => Some((ProductId::from(id), n)),
            _ => {
                warn!(product_id = %id, value = %n, "Dropping unusable legacy stock entry");
                None
            }
        })
        .collect();

    Ok(PersistedState {
        version: CURRENT_VERSION,
        saved_at: None,
        lines: legacy.cart_items.unwrap_or_default(),
        stocks,
    })
}
