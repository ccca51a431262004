//! The cart/stock store.
//!
//! [`CartStore`] is the sole mutator of cart lines and the stock cache. It is
//! meant to be created once by the application root and shared by reference
//! (usually `Arc<CartStore<..>>`) with every view.
//!
//! # Consistency
//!
//! - Reads are served from local state and never touch the network
//! - Every state change is written through to [`StateStorage`] and published
//!   to [`subscribe`](CartStore::subscribe) receivers
//! - Within one operation, steps run strictly in order. Independent
//!   operations are not serialized against each other; when two of them
//!   replace the full cart, the last response to arrive wins

mod optimistic;
mod state;

use futures::future::join_all;
use rust_decimal::Decimal;
use shopcart_core::{CartItemId, ProductId};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use crate::backend::{BackendError, CartBackend, StockTarget};
use crate::error::CartError;
use crate::models::{CartLine, Session, StockMap};
use crate::notify::{Notification, Notifier};
use crate::storage::StateStorage;

use optimistic::OptimisticAdd;

pub use optimistic::AddPhase;
pub use state::CartState;

/// Result of a read that never fails outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No session; nothing was requested.
    Skipped,
    /// Server state was applied.
    Loaded,
    /// A read failed; previous state was kept and `last_error` set.
    Failed,
}

/// Client-side mirror of the server cart plus an advisory stock cache.
pub struct CartStore<B, S> {
    backend: B,
    storage: S,
    state: watch::Sender<CartState>,
    notifier: Notifier,
}

impl<B, S> std::fmt::Debug for CartStore<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CartStore")
            .field("lines", &state.lines.len())
            .field("stocks", &state.stocks.len())
            .finish_non_exhaustive()
    }
}

impl<B: CartBackend, S: StateStorage> CartStore<B, S> {
    /// Create a store, rehydrating from `storage`.
    ///
    /// An unreadable blob is logged and ignored; the store starts empty.
    pub fn new(backend: B, storage: S) -> Self {
        let initial = match storage.load() {
            Ok(Some(persisted)) => {
                debug!(lines = persisted.lines.len(), "Rehydrated cart state");
                CartState::from_persisted(persisted)
            }
            Ok(None) => CartState::default(),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable cart state");
                CartState::default()
            }
        };

        Self {
            backend,
            storage,
            state: watch::Sender::new(initial),
            notifier: Notifier::new(),
        }
    }

    /// The backend this store talks to.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Receiver that sees every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    /// Receiver of user-facing notifications.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Clone of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    // =========================================================================
    // Derived reads
    // =========================================================================

    /// Cached available stock for a product.
    #[must_use]
    pub fn available_stock(&self, product_id: &str) -> Option<i64> {
        self.state.borrow().available_stock(product_id)
    }

    /// Sum of `unit_price * quantity` over the cart; `None` on overflow.
    #[must_use]
    pub fn total(&self) -> Option<Decimal> {
        self.state.borrow().total()
    }

    /// Sum of quantities over the cart.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.state.borrow().item_count()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Replace local cart and stock cache with the server's.
    ///
    /// Both reads run concurrently. On failure the previous state is kept and
    /// `last_error` is set; nothing is returned as an error.
    #[instrument(skip(self, session))]
    pub async fn load_cart(&self, session: Option<&Session>) -> LoadOutcome {
        let Some(session) = session else {
            debug!("No session, skipping cart load");
            return LoadOutcome::Skipped;
        };

        self.update(|state| {
            state.loading = true;
            state.last_error = None;
            true
        });

        let (cart, stocks) = tokio::join!(
            self.backend.get_cart(&session.user_id),
            self.backend.batch_stock(&session.user_id),
        );

        match (cart, stocks) {
            (Ok(lines), Ok(stocks)) => {
                info!(lines = lines.len(), products = stocks.len(), "Cart loaded");
                self.update(|state| {
                    state.lines = lines;
                    state.stocks = stocks;
                    state.loading = false;
                    true
                });
                LoadOutcome::Loaded
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to load cart");
                self.update(|state| {
                    state.loading = false;
                    state.last_error = Some(e.to_string());
                    true
                });
                self.notifier.error("Failed to load cart");
                LoadOutcome::Failed
            }
        }
    }

    /// Merge a fresh batch stock snapshot into the cache.
    ///
    /// Entries missing from the snapshot are kept.
    #[instrument(skip(self, session))]
    pub async fn refresh_all_stocks(&self, session: Option<&Session>) -> LoadOutcome {
        let Some(session) = session else {
            return LoadOutcome::Skipped;
        };

        match self.backend.batch_stock(&session.user_id).await {
            Ok(stocks) => {
                debug!(products = stocks.len(), "Stock snapshot refreshed");
                self.update(|state| state.merge_stocks(stocks));
                LoadOutcome::Loaded
            }
            Err(e) => {
                warn!(error = %e, "Stock refresh failed");
                self.update(|state| {
                    state.last_error = Some(e.to_string());
                    true
                });
                self.notifier.error("Failed to refresh stock");
                LoadOutcome::Failed
            }
        }
    }

    // =========================================================================
    // Stock lookups
    // =========================================================================

    /// Fetch one product's availability (counting the user's own
    /// reservations) and patch it into the cache.
    ///
    /// Returns `None` without a session or on failure.
    pub async fn fetch_product_stock(
        &self,
        session: Option<&Session>,
        product_id: &ProductId,
    ) -> Option<i64> {
        self.fetch_stock(session, StockTarget::Product, product_id)
            .await
    }

    /// Same as [`fetch_product_stock`](Self::fetch_product_stock) for accessories.
    pub async fn fetch_accessory_stock(
        &self,
        session: Option<&Session>,
        accessory_id: &ProductId,
    ) -> Option<i64> {
        self.fetch_stock(session, StockTarget::Accessory, accessory_id)
            .await
    }

    #[instrument(skip(self, session), fields(product_id = %id))]
    async fn fetch_stock(
        &self,
        session: Option<&Session>,
        target: StockTarget,
        id: &ProductId,
    ) -> Option<i64> {
        let session = session?;

        match self.backend.stock(&session.user_id, target, id, true).await {
            Ok(available) => {
                self.update_product_stock(id.clone(), available);
                Some(available)
            }
            Err(e) => {
                warn!(error = %e, "Stock fetch failed");
                self.notifier.error(match target {
                    StockTarget::Product => "Failed to check product availability",
                    StockTarget::Accessory => "Failed to check accessory stock",
                });
                None
            }
        }
    }

    /// Fetch stock for every cart product that has no cached figure.
    ///
    /// Returns how many lookups succeeded.
    #[instrument(skip(self, session))]
    pub async fn fetch_all_cart_stocks(&self, session: Option<&Session>) -> usize {
        let missing: Vec<ProductId> = {
            let state = self.state.borrow();
            let mut ids: Vec<ProductId> = state
                .lines
                .iter()
                .filter(|l| !state.stocks.contains_key(&l.product_id))
                .map(|l| l.product_id.clone())
                .collect();
            ids.sort();
            ids.dedup();
            ids
        };

        if missing.is_empty() {
            return 0;
        }

        join_all(
            missing
                .iter()
                .map(|id| self.fetch_product_stock(session, id)),
        )
        .await
        .into_iter()
        .flatten()
        .count()
    }

    /// Overwrite the cached figure for one product.
    pub fn update_product_stock(&self, product_id: ProductId, available: i64) {
        debug!(product_id = %product_id, available, "Patching cached stock");
        self.update(|state| state.stocks.insert(product_id, available) != Some(available));
    }

    // =========================================================================
    // Cart mutations
    // =========================================================================

    /// Reserve stock (unless pre-reserved), add the line optimistically, and
    /// persist it to the server cart.
    ///
    /// On success the cart is replaced by the server's item list and the
    /// product's cached stock by the server's figure, which is returned. If persisting fails the
    /// optimistic change is rolled back exactly and the error returned.
    ///
    /// # Errors
    ///
    /// - [`CartError::Unauthenticated`] without a session (no network call)
    /// - [`CartError::InvalidLine`] for a malformed line (no network call)
    /// - [`CartError::ReservationRejected`] or [`CartError::Backend`] if the
    ///   reservation fails (no local change)
    /// - [`CartError::Persistence`] if the final save fails (rolled back)
    #[instrument(
        skip(self, session, line),
        fields(product_id = %line.product_id, quantity = line.quantity)
    )]
    pub async fn add_to_cart(
        &self,
        session: Option<&Session>,
        line: CartLine,
    ) -> Result<i64, CartError> {
        let Some(session) = session else {
            self.notifier.error("Please log in to add items to cart");
            return Err(CartError::Unauthenticated);
        };

        if let Err(e) = line.validate() {
            let err = CartError::from(e);
            self.notifier.error(err.user_message());
            return Err(err);
        }

        if !line.already_reserved
            && let Err(e) = self
                .backend
                .reserve_stock(&session.user_id, &line.product_id, line.quantity)
                .await
        {
            let err = CartError::from_reservation(e);
            warn!(error = %err, "Reservation failed, cart untouched");
            self.notifier.error(err.user_message());
            return Err(err);
        }

        let mut op = OptimisticAdd::new(line.clone());
        self.update(|state| op.apply(state));

        match self.backend.add_to_cart(&session.user_id, &line).await {
            Ok(result) => {
                let available = result.available_stock;
                self.update(|state| op.commit(state, result));
                info!(available, phase = ?op.phase(), "Line added to cart");
                self.notifier.success(format!("{} added to cart", line.title));
                Ok(available)
            }
            Err(e) => {
                self.update(|state| op.roll_back(state));
                let err = CartError::Persistence(e);
                warn!(error = %err, "Cart save failed, optimistic add rolled back");
                self.notifier.error(err.user_message());
                Err(err)
            }
        }
    }

    /// Remove a persisted line and merge the server's stock corrections.
    ///
    /// Removing an identity the server does not know is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Unauthenticated`] without a session, or
    /// [`CartError::Backend`] if the server call fails (state untouched).
    #[instrument(skip(self, session), fields(cart_item_id = %cart_item_id))]
    pub async fn remove_from_cart(
        &self,
        session: Option<&Session>,
        cart_item_id: &CartItemId,
    ) -> Result<(), CartError> {
        let Some(session) = session else {
            self.notifier.error(CartError::Unauthenticated.user_message());
            return Err(CartError::Unauthenticated);
        };

        let corrections = match self
            .backend
            .remove_from_cart(&session.user_id, cart_item_id)
            .await
        {
            Ok(corrections) => corrections,
            Err(e) if e.is_not_found() => {
                debug!("Server does not know the line, treating as removed");
                StockMap::new()
            }
            Err(e) => return Err(self.fail(CartError::Backend(e), "Failed to remove item")),
        };

        let mut removed = false;
        self.update(|state| {
            removed = state.remove_line(cart_item_id);
            let merged = state.merge_stocks(corrections);
            removed || merged
        });

        if removed {
            self.notifier.success("Item removed from cart");
        }
        Ok(())
    }

    /// Empty the server cart and take whatever stock figures it reports.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Unauthenticated`] without a session, or
    /// [`CartError::Backend`] if the server call fails (state untouched).
    #[instrument(skip(self, session))]
    pub async fn clear_cart(&self, session: Option<&Session>) -> Result<(), CartError> {
        let Some(session) = session else {
            self.notifier.error(CartError::Unauthenticated.user_message());
            return Err(CartError::Unauthenticated);
        };

        let updated = self
            .backend
            .clear_cart(&session.user_id)
            .await
            .map_err(|e| self.fail(CartError::Backend(e), "Failed to clear cart"))?;

        self.update(|state| {
            state.lines.clear();
            state.stocks = updated.unwrap_or_default();
            true
        });
        self.notifier.success("Cart cleared successfully");
        Ok(())
    }

    /// Forget all local state and delete the persisted blob.
    ///
    /// Used on logout so a previous user's cart does not reappear. The server
    /// cart is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the blob cannot be removed; local
    /// state is cleared regardless.
    pub fn purge(&self) -> Result<(), CartError> {
        self.state.send_replace(CartState::default());
        self.storage.clear().map_err(|e| {
            warn!(error = %e, "Failed to delete saved cart");
            CartError::Storage(e)
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Apply `f` to the state; if it reports a change, publish it.
    ///
    /// The blob is rewritten only when `lines` or `stocks` moved. Flag-only
    /// changes (`loading`, `last_error`, `add_phase`) never touch storage.
    fn update(&self, f: impl FnOnce(&mut CartState) -> bool) {
        self.state.send_if_modified(|state| {
            let before = (state.lines.clone(), state.stocks.clone());
            if !f(state) {
                return false;
            }
            let persisted_changed = state.lines != before.0 || state.stocks != before.1;
            if persisted_changed && let Err(e) = self.storage.save(&state.to_persisted()) {
                warn!(error = %e, "Failed to persist cart state");
            }
            true
        });
    }

    /// Log and notify a failed operation, handing the error back.
    fn fail(&self, err: CartError, context: &str) -> CartError {
        warn!(error = %err, "{context}");
        let message = match &err {
            CartError::Backend(BackendError::Http(_)) => context.to_string(),
            other => other.user_message(),
        };
        self.notifier.error(message);
        err
    }
}
