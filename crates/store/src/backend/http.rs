//! Storefront REST client implementation.
//!
//! Uses `reqwest` with the session cookie attached to every request.
//! Nothing is cached here; the store owns the stock cache.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use shopcart_core::{CartItemId, ProductId, UserId};
use tracing::{debug, instrument};
use url::Url;

use super::types::{
    AddToCartRequest, AddToCartResponse, CartEnvelope, ErrorBody, ReserveRequest,
    ReserveResponse, SingleStockResponse, StockUpdateResponse, StocksEnvelope,
};
use super::{AddToCartResult, BackendError, CartBackend, StockTarget};
use crate::config::StoreConfig;
use crate::models::{CartLine, StockMap};

/// Header carrying a per-request correlation ID.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Characters of a response body kept in logs and error messages.
const LOGGED_BODY_CHARS: usize = 500;

// =============================================================================
// HttpBackend
// =============================================================================

/// Client for the storefront cart and stock endpoints.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base: Url,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base", &self.inner.base.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cookie is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(config: &StoreConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(cookie) = &config.session_cookie {
            let mut value = HeaderValue::from_str(cookie.expose_secret())
                .map_err(|e| BackendError::Config(format!("session cookie: {e}")))?;
            value.set_sensitive(true);
            headers.insert(header::COOKIE, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client,
                base: config.api_url.clone(),
            }),
        })
    }

    /// Build an endpoint URL by appending path segments to the base URL.
    ///
    /// Segments are percent-encoded, so IDs can never escape their position.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                BackendError::Config(format!(
                    "base URL cannot take a path: {}",
                    self.inner.base
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, BackendError> {
        let url = self.endpoint(segments)?;
        Ok(self
            .inner
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string()))
    }

    /// Send a request and decode a JSON success body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }
}

/// Turn a non-success response into a `BackendError::Status`.
fn status_error(status: StatusCode, body: &str) -> BackendError {
    tracing::error!(
        status = %status,
        body = %truncate(body),
        "Backend returned non-success status"
    );

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    BackendError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Classify a reserve-stock reply.
///
/// A refusal comes back as a 4xx or as `success: false` on a 2xx. Anything
/// else that is not a success is a backend failure, whatever its body says.
fn reservation_outcome(status: StatusCode, body: &str) -> Result<(), BackendError> {
    if !status.is_success() && !status.is_client_error() {
        return Err(status_error(status, body));
    }

    match serde_json::from_str::<ReserveResponse>(body) {
        Ok(reply) if status.is_success() && reply.success => Ok(()),
        Ok(reply) => Err(BackendError::Rejected(
            reply
                .error
                .unwrap_or_else(|| "Failed to reserve stock".to_string()),
        )),
        Err(_) if status.is_client_error() => match status_error(status, body) {
            BackendError::Status { message, .. } => Err(BackendError::Rejected(message)),
            other => Err(other),
        },
        Err(e) => Err(BackendError::Parse(e)),
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOGGED_BODY_CHARS).collect()
}

impl CartBackend for HttpBackend {
    #[instrument(skip(self), fields(user = %user))]
    async fn get_cart(&self, user: &UserId) -> Result<Vec<CartLine>, BackendError> {
        let request = self
            .request(Method::GET, &["api", "cart"])?
            .query(&[("userId", user.as_str())]);
        let envelope: CartEnvelope = self.execute(request).await?;
        Ok(envelope.cart.unwrap_or_default().items)
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn batch_stock(&self, user: &UserId) -> Result<StockMap, BackendError> {
        let request = self
            .request(Method::GET, &["api", "products", "stock", "batch"])?
            .query(&[("userId", user.as_str())]);
        let envelope: StocksEnvelope = self.execute(request).await?;
        debug!(products = envelope.stocks.len(), "Fetched stock snapshot");
        Ok(envelope.stocks)
    }

    #[instrument(skip(self), fields(user = %user, product_id = %product))]
    async fn reserve_stock(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::POST, &["api", "cart", "reserve-stock"])?
            .json(&ReserveRequest {
                user_id: user,
                product_id: product,
                quantity,
            });

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        reservation_outcome(status, &body)
    }

    #[instrument(skip(self, line), fields(user = %user, product_id = %line.product_id, quantity = line.quantity))]
    async fn add_to_cart(
        &self,
        user: &UserId,
        line: &CartLine,
    ) -> Result<AddToCartResult, BackendError> {
        let request = self
            .request(Method::POST, &["api", "cart", "add"])?
            .json(&AddToCartRequest {
                user_id: user,
                line,
            });
        let response: AddToCartResponse = self.execute(request).await?;
        Ok(AddToCartResult {
            items: response.cart.items,
            available_stock: response.available_stock,
        })
    }

    #[instrument(skip(self), fields(user = %user, cart_item_id = %item))]
    async fn remove_from_cart(
        &self,
        user: &UserId,
        item: &CartItemId,
    ) -> Result<StockMap, BackendError> {
        let request = self
            .request(Method::DELETE, &["api", "cart", "remove", item.as_str()])?
            .query(&[("userId", user.as_str())]);
        let response: StockUpdateResponse = self.execute(request).await?;
        Ok(response.updated_stocks.unwrap_or_default())
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn clear_cart(&self, user: &UserId) -> Result<Option<StockMap>, BackendError> {
        let request = self
            .request(Method::DELETE, &["api", "cart", "clear"])?
            .query(&[("userId", user.as_str())]);
        let response: StockUpdateResponse = self.execute(request).await?;
        Ok(response.updated_stocks)
    }

    #[instrument(skip(self), fields(user = %user, product_id = %id))]
    async fn stock(
        &self,
        user: &UserId,
        target: StockTarget,
        id: &ProductId,
        include_mine: bool,
    ) -> Result<i64, BackendError> {
        let mut request = self
            .request(
                Method::GET,
                &["api", target.path_segment(), "stock", id.as_str()],
            )?
            .query(&[("userId", user.as_str())]);
        if include_mine {
            request = request.query(&[("includeMine", "true")]);
        }
        let response: SingleStockResponse = self.execute(request).await?;
        Ok(response.available_stock)
    }
}
