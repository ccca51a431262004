//! Optimistic add-to-cart as an explicit three-phase operation.
//!
//! ```text
//! Idle --apply--> Pending --commit----> Committed
//!                         \-roll_back-> RolledBack
//! ```
//!
//! `apply` records exactly what it changed, so `roll_back` restores the
//! previous cart and stock entry even when the decrement was clamped at zero.
//! Out-of-order transitions are ignored and report no change.

use crate::backend::AddToCartResult;
use crate::models::CartLine;

use super::state::CartState;

/// Lifecycle of an optimistic add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddPhase {
    #[default]
    Idle,
    /// Tentative change applied, waiting for the backend.
    Pending,
    /// Replaced by the backend's authoritative state.
    Committed,
    /// Tentative change undone after a failure.
    RolledBack,
}

pub(crate) struct OptimisticAdd {
    line: CartLine,
    phase: AddPhase,
    /// Cached stock before `apply`; `None` if there was no entry.
    previous_stock: Option<i64>,
    /// Amount actually subtracted by `apply` after clamping.
    applied: i64,
}

impl OptimisticAdd {
    pub(crate) const fn new(line: CartLine) -> Self {
        Self {
            line,
            phase: AddPhase::Idle,
            previous_stock: None,
            applied: 0,
        }
    }

    pub(crate) const fn phase(&self) -> AddPhase {
        self.phase
    }

    /// Append the line and decrement its cached stock, clamped at zero.
    pub(crate) fn apply(&mut self, state: &mut CartState) -> bool {
        if self.phase != AddPhase::Idle {
            return false;
        }

        let product_id = &self.line.product_id;
        let previous = state.stocks.get(product_id).copied();
        let current = previous.unwrap_or(0);
        let next = current.saturating_sub(i64::from(self.line.quantity)).max(0);

        self.previous_stock = previous;
        self.applied = current - next;
        state.stocks.insert(product_id.clone(), next);
        state.lines.push(self.line.clone());

        self.transition(state, AddPhase::Pending);
        true
    }

    /// Replace the cart with the server's list and take its stock figure.
    pub(crate) fn commit(&mut self, state: &mut CartState, result: AddToCartResult) -> bool {
        if self.phase != AddPhase::Pending {
            return false;
        }

        state.lines = result.items;
        state
            .stocks
            .insert(self.line.product_id.clone(), result.available_stock);

        self.transition(state, AddPhase::Committed);
        true
    }

    /// Undo `apply`: drop the appended line and give back the subtracted stock.
    pub(crate) fn roll_back(&mut self, state: &mut CartState) -> bool {
        if self.phase != AddPhase::Pending {
            return false;
        }

        if let Some(pos) = state.lines.iter().rposition(|l| *l == self.line) {
            state.lines.remove(pos);
        }

        let product_id = &self.line.product_id;
        match self.previous_stock {
            None => {
                state.stocks.remove(product_id);
            }
            Some(_) => {
                *state.stocks.entry(product_id.clone()).or_insert(0) += self.applied;
            }
        }

        self.transition(state, AddPhase::RolledBack);
        true
    }

    fn transition(&mut self, state: &mut CartState, phase: AddPhase) {
        self.phase = phase;
        state.add_phase = phase;
    }
}
