//! Full store flows: `CartStore` + `HttpBackend` + `FileStorage`.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use shopcart_core::ProductId;
use shopcart_integration_tests::{MockBackend, store_config};
use shopcart_store::{
    AddPhase, CartError, CartLine, CartStore, FileStorage, HttpBackend, LoadOutcome, Session,
    StateStorage, StoreConfig,
};

type Store = CartStore<HttpBackend, FileStorage>;

struct Harness {
    mock: MockBackend,
    config: StoreConfig,
    _dir: tempfile::TempDir,
}

impl Harness {
    async fn start(mock: MockBackend) -> Self {
        let base = mock.start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = store_config(base, dir.path(), Some("u1"));
        Self {
            mock,
            config,
            _dir: dir,
        }
    }

    /// A fresh store over the same backend and state file.
    fn store(&self) -> Store {
        CartStore::new(
            HttpBackend::new(&self.config).unwrap(),
            FileStorage::new(self.config.state_path.clone()),
        )
    }

    fn session(&self) -> Session {
        self.config.session().unwrap()
    }
}

fn tee(quantity: u32) -> CartLine {
    CartLine::new("p1", "Tee", Decimal::from(5000), quantity)
}

// =============================================================================
// Add / persistence
// =============================================================================

#[tokio::test]
async fn test_add_then_rehydrate_from_disk() {
    let h = Harness::start(MockBackend::new().with_stock("p1", 5)).await;
    let session = h.session();
    let store = h.store();

    assert_eq!(store.load_cart(Some(&session)).await, LoadOutcome::Loaded);
    let available = store.add_to_cart(Some(&session), tee(2)).await.unwrap();

    assert_eq!(available, 3);
    assert_eq!(h.mock.stock_of("p1"), Some(3));
    assert_eq!(store.item_count(), 2);
    assert_eq!(store.total(), Some(Decimal::from(10_000)));
    assert_eq!(store.snapshot().add_phase, AddPhase::Committed);

    // A new store on the same file sees the same cart without any request
    let before = h.mock.requests().len();
    let reopened = h.store();
    assert_eq!(reopened.item_count(), 2);
    assert_eq!(reopened.available_stock("p1"), Some(3));
    assert_eq!(h.mock.requests().len(), before);
}

#[tokio::test]
async fn test_prereserved_add_skips_reservation() {
    let h = Harness::start(MockBackend::new().with_stock("p1", 5)).await;
    let session = h.session();
    let store = h.store();
    store.load_cart(Some(&session)).await;

    store
        .add_to_cart(Some(&session), tee(1).reserved())
        .await
        .unwrap();

    assert_eq!(h.mock.count("POST", "/api/cart/reserve-stock"), 0);
    assert_eq!(h.mock.count("POST", "/api/cart/add"), 1);
}

#[tokio::test]
async fn test_failed_save_rolls_back_local_state() {
    let h = Harness::start(MockBackend::new().with_stock("p1", 5)).await;
    let session = h.session();
    let store = h.store();
    store.load_cart(Some(&session)).await;
    let before = store.snapshot();
    h.mock.fail_adds(true);

    let err = store.add_to_cart(Some(&session), tee(2)).await.unwrap_err();

    assert!(matches!(err, CartError::Persistence(_)));
    let after = store.snapshot();
    assert_eq!(after.lines, before.lines);
    assert_eq!(after.stocks, before.stocks);
    assert_eq!(after.add_phase, AddPhase::RolledBack);

    let saved = FileStorage::new(h.config.state_path.clone())
        .load()
        .unwrap()
        .unwrap();
    assert!(saved.lines.is_empty());
    assert_eq!(saved.stocks.get("p1"), Some(&5));
}

#[tokio::test]
async fn test_rejected_reservation_leaves_cart_alone() {
    let h = Harness::start(MockBackend::new().with_stock("p1", 1)).await;
    let session = h.session();
    let store = h.store();
    store.load_cart(Some(&session)).await;
    let mut notifications = store.notifications();

    let err = store.add_to_cart(Some(&session), tee(3)).await.unwrap_err();

    assert!(matches!(err, CartError::ReservationRejected(ref m) if m == "Only 1 left in stock"));
    assert!(store.snapshot().lines.is_empty());
    assert_eq!(h.mock.count("POST", "/api/cart/add"), 0);
    assert_eq!(
        notifications.try_recv().unwrap().message,
        "Only 1 left in stock"
    );
}

#[tokio::test]
async fn test_signed_out_add_makes_no_request() {
    let h = Harness::start(MockBackend::new().with_stock("p1", 5)).await;
    let store = h.store();

    let err = store.add_to_cart(None, tee(1)).await.unwrap_err();

    assert!(matches!(err, CartError::Unauthenticated));
    assert!(h.mock.requests().is_empty());
}

// =============================================================================
// Remove / clear / refresh
// =============================================================================

#[tokio::test]
async fn test_remove_and_clear_sync_stock() {
    let h = Harness::start(MockBackend::new().with_stock("p1", 5).with_stock("p2", 2)).await;
    let session = h.session();
    let store = h.store();
    store.load_cart(Some(&session)).await;

    store.add_to_cart(Some(&session), tee(2)).await.unwrap();
    store
        .add_to_cart(
            Some(&session),
            CartLine::new("p2", "Cap", Decimal::from(1500), 1),
        )
        .await
        .unwrap();
    assert_eq!(store.available_stock("p1"), Some(3));

    let id = store.snapshot().lines[0].cart_item_id.clone().unwrap();
    store.remove_from_cart(Some(&session), &id).await.unwrap();
    assert_eq!(store.available_stock("p1"), Some(5));
    assert_eq!(store.snapshot().lines.len(), 1);

    // Unknown identity: no error, nothing changes
    store.remove_from_cart(Some(&session), &id).await.unwrap();
    assert_eq!(store.snapshot().lines.len(), 1);

    store.clear_cart(Some(&session)).await.unwrap();
    assert!(store.snapshot().lines.is_empty());
    assert_eq!(store.available_stock("p2"), Some(2));
    assert!(h.mock.cart_of("u1").is_empty());
}

#[tokio::test]
async fn test_load_failure_keeps_previous_cart() {
    let h = Harness::start(MockBackend::new().with_stock("p1", 5)).await;
    let session = h.session();
    let store = h.store();
    store.load_cart(Some(&session)).await;
    store.add_to_cart(Some(&session), tee(1)).await.unwrap();
    h.mock.fail_reads(true);

    assert_eq!(store.load_cart(Some(&session)).await, LoadOutcome::Failed);

    let state = store.snapshot();
    assert_eq!(state.lines.len(), 1);
    assert!(!state.loading);
    assert!(state.last_error.is_some());
}

#[tokio::test]
async fn test_stock_lookups_patch_cache() {
    let h = Harness::start(MockBackend::new().with_stock("p1", 5).with_stock("p2", 4)).await;
    let session = h.session();
    let store = h.store();

    store.add_to_cart(Some(&session), tee(2)).await.unwrap();
    // Own reservation counts toward the figure shown on the product page
    let p1 = ProductId::new("p1");
    assert_eq!(
        store.fetch_product_stock(Some(&session), &p1).await,
        Some(5)
    );
    assert_eq!(store.available_stock("p1"), Some(5));

    assert_eq!(
        store.refresh_all_stocks(Some(&session)).await,
        LoadOutcome::Loaded
    );
    assert_eq!(store.available_stock("p1"), Some(3));
    assert_eq!(store.available_stock("p2"), Some(4));

    let unknown = ProductId::new("nope");
    assert_eq!(store.fetch_product_stock(Some(&session), &unknown).await, None);
}

#[tokio::test]
async fn test_purge_removes_state_file() {
    let h = Harness::start(MockBackend::new().with_stock("p1", 5)).await;
    let session = h.session();
    let store = h.store();
    store.add_to_cart(Some(&session), tee(1)).await.unwrap();
    assert!(h.config.state_path.exists());

    store.purge().unwrap();

    assert!(!h.config.state_path.exists());
    assert_eq!(h.store().item_count(), 0);
    // The server cart is untouched
    assert_eq!(h.mock.cart_of("u1").len(), 1);
}
