//! Request handlers driven by the executor and the test server.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use tokio::runtime::{Builder, Runtime};
use tower::{Service, ServiceExt};

use super::recorder::ResponseRecorder;
use crate::error::{HarnessError, Result};

/// Produces a response for a request by writing into a recorder.
///
/// Any `Fn(&Request<Bytes>, &mut ResponseRecorder)` is a handler:
///
/// ```
/// use casebook::{Bytes, Handler, ResponseRecorder};
/// use casebook::http::{Request, StatusCode};
///
/// let teapot = |_: &Request<Bytes>, response: &mut ResponseRecorder| {
///     response.set_status(StatusCode::IM_A_TEAPOT);
/// };
/// let mut recorder = ResponseRecorder::new();
/// teapot.handle(&Request::new(Bytes::new()), &mut recorder);
/// assert_eq!(recorder.status(), StatusCode::IM_A_TEAPOT);
/// ```
pub trait Handler {
    /// Handles `request`, writing the response into `response`.
    fn handle(&self, request: &Request<Bytes>, response: &mut ResponseRecorder);
}

impl<F> Handler for F
where
    F: Fn(&Request<Bytes>, &mut ResponseRecorder),
{
    fn handle(&self, request: &Request<Bytes>, response: &mut ResponseRecorder) {
        self(request, response);
    }
}

/// A cloneable, thread-safe handler, as stored by the test server.
///
/// Wrapping lets handlers of different types share one collection.
#[derive(Clone)]
pub struct SharedHandler(Arc<dyn Handler + Send + Sync>);

impl SharedHandler {
    /// Wraps `handler`.
    pub fn new<H>(handler: H) -> Self
    where
        H: Handler + Send + Sync + 'static,
    {
        Self(Arc::new(handler))
    }
}

impl Handler for SharedHandler {
    fn handle(&self, request: &Request<Bytes>, response: &mut ResponseRecorder) {
        self.0.handle(request, response);
    }
}

impl fmt::Debug for SharedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedHandler")
    }
}

/// Adapts a `tower` service, such as an `axum::Router`, into a [`Handler`].
///
/// Each request is driven to completion on a private current-thread
/// runtime, so the adapter must not be called from inside another Tokio
/// runtime. In particular it cannot be registered on a
/// [`TestServer`](crate::TestServer).
pub struct ServiceHandler<S> {
    service: S,
    runtime: Runtime,
}

impl<S> ServiceHandler<S> {
    /// Wraps `service`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Runtime`] when the private runtime cannot be
    /// built.
    pub fn new(service: S) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| HarnessError::Runtime {
                what: "service runtime",
                source,
            })?;
        Ok(Self { service, runtime })
    }
}

impl<S> fmt::Debug for ServiceHandler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandler")
            .field("service", &std::any::type_name::<S>())
            .finish_non_exhaustive()
    }
}

impl<S, B> Handler for ServiceHandler<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<B>> + Clone,
    S::Error: fmt::Display,
    B: Body,
    B::Error: fmt::Display,
{
    fn handle(&self, request: &Request<Bytes>, response: &mut ResponseRecorder) {
        let mut forwarded = Request::new(Full::new(request.body().clone()));
        *forwarded.method_mut() = request.method().clone();
        *forwarded.uri_mut() = request.uri().clone();
        *forwarded.version_mut() = request.version();
        *forwarded.headers_mut() = request.headers().clone();

        let service = self.service.clone();
        let outcome = self.runtime.block_on(async move {
            let reply = service
                .oneshot(forwarded)
                .await
                .map_err(|err| format!("service error: {err}"))?;
            let (parts, body) = reply.into_parts();
            let collected = body
                .collect()
                .await
                .map_err(|err| format!("body error: {err}"))?;
            Ok::<_, String>((parts, collected.to_bytes()))
        });

        match outcome {
            Ok((parts, body)) => {
                response.set_status(parts.status);
                response.headers_mut().extend(parts.headers);
                response.write_body(body);
            }
            Err(message) => {
                tracing::error!(uri = %request.uri(), %message, "service failed to respond");
                response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                response.write_body(message);
            }
        }
    }
}
