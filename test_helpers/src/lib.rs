//! Test helpers shared across the casebook workspace.
//!
//! Provides handlers with observable side effects, an in-memory item store
//! for multi-step scenarios, and small receiver types for method wrapping.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use casebook::http::header::{CONTENT_TYPE, LOCATION};
use casebook::http::{HeaderValue, Method, Request, StatusCode};
use casebook::{Bytes, Handler, ResponseRecorder};
use parking_lot::Mutex;

/// Answers with a fixed status and counts the requests it receives.
///
/// Clones share the counter, so a test can keep one clone and hand the
/// other to an executor or server.
#[derive(Debug, Clone)]
pub struct CountingHandler {
    hits: Arc<AtomicUsize>,
    status: StatusCode,
    body: Bytes,
}

impl CountingHandler {
    /// A handler answering every request with `status` and no body.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            hits: Arc::new(AtomicUsize::new(0)),
            status,
            body: Bytes::new(),
        }
    }

    /// Sets the body sent with every response.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Number of requests handled so far, across all clones.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Handler for CountingHandler {
    fn handle(&self, _request: &Request<Bytes>, response: &mut ResponseRecorder) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        response.set_status(self.status);
        response.write_body(&self.body);
    }
}

/// Echoes the request body and content type, and reports the method in
/// `X-Method` and the query string in `X-Query`.
pub fn echo(request: &Request<Bytes>, response: &mut ResponseRecorder) {
    if let Some(kind) = request.headers().get(CONTENT_TYPE) {
        response.set_header(CONTENT_TYPE, kind.clone());
    }
    if let Ok(method) = HeaderValue::from_str(request.method().as_str()) {
        response.headers_mut().insert("x-method", method);
    }
    if let Some(query) = request.uri().query()
        && let Ok(value) = HeaderValue::from_str(query)
    {
        response.headers_mut().insert("x-query", value);
    }
    response.write_body(request.body());
}

/// A tiny REST-style store: `POST /items` creates, `GET /items/{id}` reads
/// and `DELETE /items/{id}` removes.
///
/// Every request, whatever its outcome, increments [`requests`](Self::requests).
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: Arc<Mutex<BTreeMap<u32, Bytes>>>,
    next_id: Arc<Mutex<u32>>,
    requests: Arc<AtomicUsize>,
}

impl ItemStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests received so far, across all clones.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn create(&self, body: &Bytes, response: &mut ResponseRecorder) {
        if body.is_empty() {
            response.set_status(StatusCode::BAD_REQUEST);
            return;
        }
        let id = {
            let mut next = self.next_id.lock();
            *next = next.saturating_add(1);
            *next
        };
        self.items.lock().insert(id, body.clone());
        response.set_status(StatusCode::CREATED);
        if let Ok(location) = HeaderValue::from_str(&format!("/items/{id}")) {
            response.set_header(LOCATION, location);
        }
    }
}

impl Handler for ItemStore {
    fn handle(&self, request: &Request<Bytes>, response: &mut ResponseRecorder) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let path = request.uri().path();
        if path == "/items" {
            if request.method() == Method::POST {
                self.create(request.body(), response);
            } else {
                response.set_status(StatusCode::METHOD_NOT_ALLOWED);
            }
            return;
        }
        let Some(id) = path
            .strip_prefix("/items/")
            .and_then(|raw| raw.parse::<u32>().ok())
        else {
            response.set_status(StatusCode::NOT_FOUND);
            return;
        };
        match *request.method() {
            Method::GET => match self.items.lock().get(&id) {
                Some(body) => response.write_body(body),
                None => response.set_status(StatusCode::NOT_FOUND),
            },
            Method::DELETE => {
                let status = if self.items.lock().remove(&id).is_some() {
                    StatusCode::NO_CONTENT
                } else {
                    StatusCode::NOT_FOUND
                };
                response.set_status(status);
            }
            _ => response.set_status(StatusCode::METHOD_NOT_ALLOWED),
        }
    }
}

/// Receiver type for method-wrapping tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ledger {
    balance: i64,
}

impl Ledger {
    /// A ledger holding `balance`.
    #[must_use]
    pub const fn new(balance: i64) -> Self {
        Self { balance }
    }

    /// Balance after a deposit, or `None` on overflow.
    #[must_use]
    pub const fn deposit(&self, amount: i64) -> Option<i64> {
        self.balance.checked_add(amount)
    }

    /// Splits the balance into `parts` equal shares and a remainder.
    ///
    /// # Errors
    ///
    /// Returns a message when `parts` is zero.
    pub fn split(&self, parts: i64) -> Result<(i64, i64), String> {
        match (self.balance.checked_div(parts), self.balance.checked_rem(parts)) {
            (Some(share), Some(rest)) => Ok((share, rest)),
            _ => Err(format!("cannot split {} into {parts} parts", self.balance)),
        }
    }
}
