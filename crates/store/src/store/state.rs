//! Observable cart state.

use rust_decimal::Decimal;
use shopcart_core::{CartItemId, CurrencyCode, Price, PriceError};

use super::optimistic::AddPhase;
use crate::models::{CartLine, StockMap};
use crate::storage::PersistedState;

/// Everything the store knows, as published to subscribers.
///
/// Only `lines` and `stocks` are persisted; the flags describe the current
/// session and start fresh on every load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Cart lines in insertion order. Identical lines are never merged.
    pub lines: Vec<CartLine>,
    /// Advisory available stock per product.
    pub stocks: StockMap,
    /// A full cart load is in flight.
    pub loading: bool,
    /// Message from the last failed read, cleared on the next load attempt.
    pub last_error: Option<String>,
    /// Phase of the most recent add-to-cart.
    pub add_phase: AddPhase,
}

impl CartState {
    /// Rehydrate from the persisted blob.
    #[must_use]
    pub fn from_persisted(persisted: PersistedState) -> Self {
        Self {
            lines: persisted.lines,
            stocks: persisted.stocks,
            ..Self::default()
        }
    }

    /// The persisted part of the state.
    #[must_use]
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState::new(self.lines.clone(), self.stocks.clone())
    }

    /// Cached available stock for a product, if it was ever fetched.
    #[must_use]
    pub fn available_stock(&self, product_id: &str) -> Option<i64> {
        self.stocks.get(product_id).copied()
    }

    /// Sum of `unit_price * quantity` over all lines.
    ///
    /// Lines come from the server unchecked; `None` means the sum overflowed.
    #[must_use]
    pub fn total(&self) -> Option<Decimal> {
        self.lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.line_total()?))
    }

    /// [`total`](Self::total) as a price in the given currency.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the sum does not fit a `Decimal`.
    pub fn total_price(&self, currency: CurrencyCode) -> Result<Price, PriceError> {
        self.lines.iter().try_fold(Price::zero(currency), |acc, line| {
            acc.checked_add(Price::new(line.unit_price, currency).times(line.quantity)?)
        })
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Look up a persisted line by its server identity.
    #[must_use]
    pub fn line(&self, id: &CartItemId) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|l| l.cart_item_id.as_ref() == Some(id))
    }

    /// Overwrite cached figures with `updates`, keeping entries it lacks.
    ///
    /// Returns whether anything changed.
    pub(crate) fn merge_stocks(&mut self, updates: StockMap) -> bool {
        let mut changed = false;
        for (id, stock) in updates {
            if self.stocks.insert(id, stock) != Some(stock) {
                changed = true;
            }
        }
        changed
    }

    /// Remove the line with the given identity. Returns whether one was found.
    pub(crate) fn remove_line(&mut self, id: &CartItemId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.cart_item_id.as_ref() != Some(id));
        self.lines.len() != before
    }
}
