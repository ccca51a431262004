//! End-to-end test support for Shopcart.
//!
//! [`MockBackend`] is an in-process axum server speaking the storefront cart
//! and stock API. It keeps just enough inventory logic for the store to be
//! exercised realistically: reservations decrement stock, removals and clears
//! release it, and single-product lookups can count the caller's own
//! reservations.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopcart-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path as UrlPath, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use shopcart_core::{CartItemId, UserId};
use shopcart_store::{CartLine, StoreConfig};
use tower_http::trace::TraceLayer;
use url::Url;

/// Cookie the mock expects on every request.
pub const SESSION_COOKIE: &str = "session=integration-test";

/// One request as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub cookie: Option<String>,
    pub has_request_id: bool,
}

#[derive(Debug, Default)]
struct MockState {
    stock: BTreeMap<String, i64>,
    reserved: HashMap<(String, String), i64>,
    carts: HashMap<String, Vec<CartLine>>,
    next_id: u64,
    fail_adds: bool,
    fail_reads: bool,
    requests: Vec<RecordedRequest>,
}

impl MockState {
    fn release(&mut self, user: &str, line: &CartLine) {
        let quantity = i64::from(line.quantity);
        *self
            .stock
            .entry(line.product_id.as_str().to_string())
            .or_insert(0) += quantity;
        if let Some(held) = self
            .reserved
            .get_mut(&(user.to_string(), line.product_id.as_str().to_string()))
        {
            *held = (*held - quantity).max(0);
        }
    }
}

/// In-process fake of the storefront backend.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the available inventory of a product.
    #[must_use]
    pub fn with_stock(self, product_id: &str, available: i64) -> Self {
        self.lock().stock.insert(product_id.to_string(), available);
        self
    }

    /// Make every `POST /api/cart/add` fail with a 500.
    pub fn fail_adds(&self, fail: bool) {
        self.lock().fail_adds = fail;
    }

    /// Make cart and batch-stock reads fail with a 503.
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    #[must_use]
    pub fn stock_of(&self, product_id: &str) -> Option<i64> {
        self.lock().stock.get(product_id).copied()
    }

    #[must_use]
    pub fn cart_of(&self, user: &str) -> Vec<CartLine> {
        self.lock().carts.get(user).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests whose path starts with `prefix`.
    #[must_use]
    pub fn count(&self, method: &str, prefix: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(prefix))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Router serving the mock API.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/cart", get(get_cart))
            .route("/api/cart/reserve-stock", post(reserve_stock))
            .route("/api/cart/add", post(add_to_cart))
            .route("/api/cart/remove/{id}", delete(remove_from_cart))
            .route("/api/cart/clear", delete(clear_cart))
            .route("/api/products/stock/batch", get(batch_stock))
            .route("/api/products/stock/{id}", get(single_stock))
            .route("/api/accessories/stock/{id}", get(single_stock))
            .layer(middleware::from_fn_with_state(self.clone(), record))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    /// Bind to an ephemeral port, serve in the background, and return the
    /// base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(&self) -> std::io::Result<Url> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });

        Url::parse(&format!("http://{addr}"))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    }
}

/// Store configuration pointing at `base`, persisting under `dir`.
#[must_use]
pub fn store_config(base: Url, dir: &Path, user: Option<&str>) -> StoreConfig {
    let mut config = StoreConfig::new(base);
    config.state_path = dir.join("cart-storage.json");
    config.session_cookie = Some(SESSION_COOKIE.to_string().into());
    config.user_id = user.map(UserId::from);
    config
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserQuery {
    user_id: String,
    #[serde(default)]
    include_mine: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReserveBody {
    user_id: String,
    product_id: String,
    quantity: i64,
}

async fn record(State(mock): State<MockBackend>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        cookie: headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        has_request_id: headers.contains_key("x-request-id"),
    };
    mock.lock().requests.push(recorded);
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn get_cart(State(mock): State<MockBackend>, Query(q): Query<UserQuery>) -> Response {
    let state = mock.lock();
    if state.fail_reads {
        return error(StatusCode::SERVICE_UNAVAILABLE, "Cart service unavailable");
    }
    let items = state.carts.get(&q.user_id).cloned().unwrap_or_default();
    Json(json!({ "cart": { "items": items } })).into_response()
}

async fn batch_stock(State(mock): State<MockBackend>, Query(_q): Query<UserQuery>) -> Response {
    let state = mock.lock();
    if state.fail_reads {
        return error(StatusCode::SERVICE_UNAVAILABLE, "Stock service unavailable");
    }
    Json(json!({ "stocks": state.stock })).into_response()
}

async fn reserve_stock(State(mock): State<MockBackend>, Json(body): Json<ReserveBody>) -> Response {
    let mut state = mock.lock();
    let available = state.stock.get(&body.product_id).copied().unwrap_or(0);

    if body.quantity > available {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "error": format!("Only {available} left in stock"),
            })),
        )
            .into_response();
    }

    state
        .stock
        .insert(body.product_id.clone(), available - body.quantity);
    *state
        .reserved
        .entry((body.user_id, body.product_id))
        .or_insert(0) += body.quantity;
    Json(json!({ "success": true })).into_response()
}

async fn add_to_cart(State(mock): State<MockBackend>, Json(body): Json<Value>) -> Response {
    let Some(user) = body.get("userId").and_then(Value::as_str).map(str::to_string) else {
        return error(StatusCode::BAD_REQUEST, "userId is required");
    };
    let mut line: CartLine = match serde_json::from_value(body) {
        Ok(line) => line,
        Err(e) => return error(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let mut state = mock.lock();
    if state.fail_adds {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable");
    }

    state.next_id += 1;
    line.cart_item_id = Some(CartItemId::new(format!("ci-{}", state.next_id)));
    line.already_reserved = false;
    let available = state
        .stock
        .get(line.product_id.as_str())
        .copied()
        .unwrap_or(0);

    let cart = state.carts.entry(user).or_default();
    cart.push(line);
    Json(json!({ "cart": { "items": cart }, "availableStock": available })).into_response()
}

async fn remove_from_cart(
    State(mock): State<MockBackend>,
    UrlPath(id): UrlPath<String>,
    Query(q): Query<UserQuery>,
) -> Response {
    let mut state = mock.lock();
    let cart = state.carts.entry(q.user_id.clone()).or_default();
    let Some(pos) = cart
        .iter()
        .position(|l| l.cart_item_id.as_ref().map(CartItemId::as_str) == Some(id.as_str()))
    else {
        return error(StatusCode::NOT_FOUND, "Cart item not found");
    };

    let line = cart.remove(pos);
    state.release(&q.user_id, &line);
    let product = line.product_id.as_str().to_string();
    let available = state.stock.get(&product).copied().unwrap_or(0);
    Json(json!({ "updatedStocks": { product: available } })).into_response()
}

async fn clear_cart(State(mock): State<MockBackend>, Query(q): Query<UserQuery>) -> Response {
    let mut state = mock.lock();
    let lines = state.carts.remove(&q.user_id).unwrap_or_default();
    for line in &lines {
        state.release(&q.user_id, line);
    }
    Json(json!({ "updatedStocks": state.stock })).into_response()
}

async fn single_stock(
    State(mock): State<MockBackend>,
    UrlPath(id): UrlPath<String>,
    Query(q): Query<UserQuery>,
) -> Response {
    let state = mock.lock();
    let Some(available) = state.stock.get(&id).copied() else {
        return error(StatusCode::NOT_FOUND, "Product not found");
    };
    let mine = if q.include_mine.as_deref() == Some("true") {
        state.reserved.get(&(q.user_id, id)).copied().unwrap_or(0)
    } else {
        0
    };
    Json(json!({ "availableStock": available + mine })).into_response()
}
