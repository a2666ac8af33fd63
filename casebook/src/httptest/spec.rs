//! Declarative request/response descriptions.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderName, Method, Request, StatusCode};
use serde::Serialize;

use crate::error::{HarnessError, Result};

/// One request to send and the parts of the response to check.
///
/// Expectations left as `None` are not asserted. Response headers are
/// matched as a subset: every listed pair must be present, extra headers in
/// the actual response are ignored.
///
/// # Examples
///
/// ```
/// use casebook::HttpTestSpec;
/// use casebook::http::StatusCode;
///
/// let spec = HttpTestSpec::post("/items")
///     .header("Content-Type", "text/plain")
///     .body("apple")
///     .expect_status(StatusCode::CREATED)
///     .expect_header("Location", "/items/1");
/// assert_eq!(spec.label(), "POST /items");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpTestSpec {
    /// Request method; defaults to `GET`.
    pub method: Method,
    /// Request path, with or without a leading `/`.
    pub path: String,
    /// Query parameters, URL-encoded and appended in order.
    pub query_params: Vec<(String, String)>,
    /// Request headers, in order.
    pub request_headers: Vec<(String, String)>,
    /// Request body; `None` sends an empty body.
    pub request_body: Option<Bytes>,
    /// Expected status code.
    pub status: Option<StatusCode>,
    /// Expected response headers (subset match).
    pub response_headers: Option<Vec<(String, String)>>,
    /// Expected response body, compared byte for byte.
    pub response_body: Option<Bytes>,
}

impl HttpTestSpec {
    /// A spec for `method` on `path` with no expectations.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    /// A `GET` spec.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A `POST` spec.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// A `PUT` spec.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// A `DELETE` spec.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Appends a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.push((name.into(), value.into()));
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request_body = Some(body.into());
        self
    }

    /// Serialises `value` as the JSON request body and sets `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Json`] when `value` cannot be serialised.
    pub fn json_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header(CONTENT_TYPE.as_str(), "application/json")
            .body(body))
    }

    /// Expects the response status to equal `status`.
    #[must_use]
    pub const fn expect_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Expects the response to carry `name: value`.
    #[must_use]
    pub fn expect_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response_headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    /// Expects the response body to equal `body` exactly.
    #[must_use]
    pub fn expect_body(mut self, body: impl Into<Bytes>) -> Self {
        self.response_body = Some(body.into());
        self
    }

    /// Short description used in sub-case names, such as `GET /items`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.normalised_path())
    }

    fn normalised_path(&self) -> String {
        if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        }
    }

    /// Path followed by the encoded query string, if any.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        let path = self.normalised_path();
        if self.query_params.is_empty() {
            return path;
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query_params)
            .finish();
        let separator = if path.contains('?') { '&' } else { '?' };
        format!("{path}{separator}{query}")
    }

    /// Builds the request described by this spec.
    ///
    /// Expected response header names are validated here too, so every
    /// malformed part is reported before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidRequest`] when the path, a header name
    /// or a header value cannot be represented, or when an expected header
    /// name is not a valid HTTP header name.
    pub fn to_request(&self) -> Result<Request<Bytes>> {
        for (name, _) in self.response_headers.iter().flatten() {
            self.expected_header_name(name)?;
        }
        let builder = self.request_headers.iter().fold(
            Request::builder()
                .method(self.method.clone())
                .uri(self.path_and_query()),
            |builder, (name, value)| builder.header(name.as_str(), value.as_str()),
        );
        builder
            .body(self.request_body.clone().unwrap_or_default())
            .map_err(|err| HarnessError::InvalidRequest {
                target: self.label(),
                message: err.to_string(),
            })
    }

    pub(crate) fn expected_header_name(&self, name: &str) -> Result<HeaderName> {
        HeaderName::from_bytes(name.as_bytes()).map_err(|err| HarnessError::InvalidRequest {
            target: self.label(),
            message: format!("expected header {name:?}: {err}"),
        })
    }
}

/// Ordered steps executed until the first failing one.
///
/// # Examples
///
/// ```
/// use casebook::{HttpTestSpec, MultiHttpTestSpec};
/// use casebook::http::StatusCode;
///
/// let scenario = MultiHttpTestSpec::named("create then read")
///     .step(HttpTestSpec::post("/items").body("apple").expect_status(StatusCode::CREATED))
///     .step(HttpTestSpec::get("/items/1").expect_body("apple"));
/// assert_eq!(scenario.steps.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiHttpTestSpec {
    /// Group name for the scenario's sub-cases; defaults to `steps`.
    pub name: Option<String>,
    /// Steps, in execution order.
    pub steps: Vec<HttpTestSpec>,
}

impl MultiHttpTestSpec {
    /// A scenario made of `steps`.
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = HttpTestSpec>) -> Self {
        Self {
            name: None,
            steps: steps.into_iter().collect(),
        }
    }

    /// An empty scenario with an explicit group name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, spec: HttpTestSpec) -> Self {
        self.steps.push(spec);
        self
    }

    /// Group name used for the scenario.
    #[must_use]
    pub fn group(&self) -> &str {
        self.name.as_deref().unwrap_or("steps")
    }
}

impl FromIterator<HttpTestSpec> for MultiHttpTestSpec {
    fn from_iter<I: IntoIterator<Item = HttpTestSpec>>(iter: I) -> Self {
        Self::new(iter)
    }
}
