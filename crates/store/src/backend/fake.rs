//! Scripted in-memory backend for store tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use shopcart_core::{CartItemId, ProductId, UserId};

use super::{AddToCartResult, BackendError, CartBackend, StockTarget};
use crate::models::{CartLine, StockMap};

/// Each queue holds the replies for successive calls of one endpoint.
/// An empty queue answers with a 500.
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub get_cart: Mutex<VecDeque<Result<Vec<CartLine>, BackendError>>>,
    pub batch_stock: Mutex<VecDeque<Result<StockMap, BackendError>>>,
    pub reserve: Mutex<VecDeque<Result<(), BackendError>>>,
    pub add: Mutex<VecDeque<Result<AddToCartResult, BackendError>>>,
    pub remove: Mutex<VecDeque<Result<StockMap, BackendError>>>,
    pub clear: Mutex<VecDeque<Result<Option<StockMap>, BackendError>>>,
    pub stock: Mutex<VecDeque<Result<i64, BackendError>>>,
    pub stock_requests: Mutex<Vec<(StockTarget, ProductId, bool)>>,
    calls: AtomicUsize,
}

pub(crate) fn server_error() -> BackendError {
    BackendError::Status {
        status: 500,
        message: "Internal Server Error".to_string(),
    }
}

fn next<T>(queue: &Mutex<VecDeque<Result<T, BackendError>>>) -> Result<T, BackendError> {
    queue
        .lock()
        .ok()
        .and_then(|mut q| q.pop_front())
        .unwrap_or_else(|| Err(server_error()))
}

fn push<T>(queue: &Mutex<VecDeque<T>>, value: T) {
    if let Ok(mut q) = queue.lock() {
        q.push_back(value);
    }
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Total number of backend calls made.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn on_get_cart(self, reply: Result<Vec<CartLine>, BackendError>) -> Self {
        push(&self.get_cart, reply);
        self
    }

    pub(crate) fn on_batch_stock(self, reply: Result<StockMap, BackendError>) -> Self {
        push(&self.batch_stock, reply);
        self
    }

    pub(crate) fn on_reserve(self, reply: Result<(), BackendError>) -> Self {
        push(&self.reserve, reply);
        self
    }

    pub(crate) fn on_add(self, reply: Result<AddToCartResult, BackendError>) -> Self {
        push(&self.add, reply);
        self
    }

    pub(crate) fn on_remove(self, reply: Result<StockMap, BackendError>) -> Self {
        push(&self.remove, reply);
        self
    }

    pub(crate) fn on_clear(self, reply: Result<Option<StockMap>, BackendError>) -> Self {
        push(&self.clear, reply);
        self
    }

    pub(crate) fn on_stock(self, reply: Result<i64, BackendError>) -> Self {
        push(&self.stock, reply);
        self
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl CartBackend for FakeBackend {
    async fn get_cart(&self, _user: &UserId) -> Result<Vec<CartLine>, BackendError> {
        self.record();
        next(&self.get_cart)
    }

    async fn batch_stock(&self, _user: &UserId) -> Result<StockMap, BackendError> {
        self.record();
        next(&self.batch_stock)
    }

    async fn reserve_stock(
        &self,
        _user: &UserId,
        _product: &ProductId,
        _quantity: u32,
    ) -> Result<(), BackendError> {
        self.record();
        next(&self.reserve)
    }

    async fn add_to_cart(
        &self,
        _user: &UserId,
        _line: &CartLine,
    ) -> Result<AddToCartResult, BackendError> {
        self.record();
        next(&self.add)
    }

    async fn remove_from_cart(
        &self,
        _user: &UserId,
        _item: &CartItemId,
    ) -> Result<StockMap, BackendError> {
        self.record();
        next(&self.remove)
    }

    async fn clear_cart(&self, _user: &UserId) -> Result<Option<StockMap>, BackendError> {
        self.record();
        next(&self.clear)
    }

    async fn stock(
        &self,
        _user: &UserId,
        target: StockTarget,
        id: &ProductId,
        include_mine: bool,
    ) -> Result<i64, BackendError> {
        self.record();
        if let Ok(mut requests) = self.stock_requests.lock() {
            requests.push((target, id.clone(), include_mine));
        }
        next(&self.stock)
    }
}
