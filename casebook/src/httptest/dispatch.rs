//! Transports that turn a request into a recorded response.

use bytes::Bytes;
use http::Request;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use url::Url;

use super::handler::Handler;
use super::recorder::{RecordedResponse, ResponseRecorder};
use crate::error::{HarnessError, Result};

/// Sends a request somewhere and captures the response.
pub trait Dispatch {
    /// Dispatches `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`HarnessError`] when the request could not be delivered.
    /// Unexpected responses are not errors.
    fn dispatch(&self, request: Request<Bytes>) -> Result<RecordedResponse>;
}

/// Calls a handler directly, without a socket.
#[derive(Debug, Clone)]
pub struct InProcess<H> {
    handler: H,
}

impl<H: Handler> InProcess<H> {
    /// Dispatches to `handler`.
    pub const fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<H: Handler> Dispatch for InProcess<H> {
    fn dispatch(&self, request: Request<Bytes>) -> Result<RecordedResponse> {
        let mut recorder = ResponseRecorder::new();
        self.handler.handle(&request, &mut recorder);
        Ok(recorder.finish())
    }
}

/// Client-side behaviour for [`Remote`] dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Follow 3xx responses instead of reporting them.
    pub follow_redirects: bool,
}

/// Sends requests over HTTP to a base URL.
///
/// Uses a blocking client, which must not be driven from inside an async
/// runtime.
#[derive(Debug, Clone)]
pub struct Remote {
    endpoint: Url,
    client: Client,
}

impl Remote {
    /// Targets `endpoint`, whose path prefixes every request path.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidRequest`] when `endpoint` is not an
    /// absolute base URL or carries a query or fragment, and
    /// [`HarnessError::Transport`] when the client cannot be built.
    pub fn new(endpoint: &str, options: ExecutorOptions) -> Result<Self> {
        let invalid = |message: String| HarnessError::InvalidRequest {
            target: endpoint.to_owned(),
            message,
        };
        let base = Url::parse(endpoint).map_err(|err| invalid(err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid(String::from("endpoint cannot be a base URL")));
        }
        if base.query().is_some() || base.fragment().is_some() {
            return Err(invalid(String::from(
                "endpoint must not carry a query or fragment",
            )));
        }
        let policy = if options.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = Client::builder()
            .redirect(policy)
            .build()
            .map_err(|source| HarnessError::Transport {
                url: base.to_string(),
                source,
            })?;
        Ok(Self {
            endpoint: base,
            client,
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn resolve(&self, request: &Request<Bytes>) -> Url {
        let uri = request.uri();
        let prefix = self.endpoint.path().trim_end_matches('/');
        let mut url = self.endpoint.clone();
        url.set_path(&format!("{prefix}{}", uri.path()));
        url.set_query(uri.query());
        url
    }
}

impl Dispatch for Remote {
    fn dispatch(&self, request: Request<Bytes>) -> Result<RecordedResponse> {
        let url = self.resolve(&request);
        let (parts, body) = request.into_parts();
        tracing::debug!(method = %parts.method, %url, "sending request");
        let transport = |source| HarnessError::Transport {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .request(parts.method, url.clone())
            .headers(parts.headers)
            .body(body)
            .send()
            .map_err(transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let payload = response.bytes().map_err(transport)?;
        Ok(RecordedResponse {
            status,
            headers,
            body: payload,
        })
    }
}
