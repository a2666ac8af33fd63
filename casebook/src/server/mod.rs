//! A real HTTP/1.1 server whose routes can change while it is listening.
//!
//! Use it when the code under test only accepts a URL. Handlers are keyed
//! by exact request path; requests to other paths answer `404 Not Found`.
//!
//! ```no_run
//! use casebook::TestServer;
//! use casebook::http::StatusCode;
//! use casebook::server::string_response;
//!
//! # fn main() -> casebook::Result<()> {
//! let server = TestServer::start(0)?;
//! server.add_handler("/greeting", string_response(StatusCode::OK, "hello"));
//! let url = format!("{}/greeting", server.url());
//! // hand `url` to the code under test...
//! server.shutdown();
//! # Ok(())
//! # }
//! ```

mod responses;

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::{Mutex, RwLock};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

pub use responses::{empty_response, json_response, string_response};

use crate::case::TestCase;
use crate::error::{HarnessError, Result};
use crate::httptest::{
    Handler, HttpExecutor, Remote, ResponseRecorder, SharedHandler, serve_endpoint,
};

type Registry = Arc<RwLock<HashMap<String, SharedHandler>>>;

/// Where a [`TestServer`] listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind; defaults to `127.0.0.1`.
    pub host: IpAddr,
    /// Port to bind; `0`, the default, picks a free port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        }
    }
}

impl ServerConfig {
    /// Sets the interface to bind.
    #[must_use]
    pub const fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Sets the port to bind.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    thread: JoinHandle<()>,
}

/// Background HTTP server with a mutable handler registry.
///
/// The server starts listening as soon as it is constructed and serves
/// from its own thread. [`shutdown`](Self::shutdown) stops accepting,
/// lets in-flight requests finish and releases the port; it also runs on
/// drop.
pub struct TestServer {
    addr: SocketAddr,
    registry: Registry,
    running: Mutex<Option<Running>>,
}

impl TestServer {
    /// Starts a server on `127.0.0.1:port`; `0` picks a free port.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Bind`] when the port cannot be bound, or
    /// [`HarnessError::Runtime`] when the serving thread cannot start.
    pub fn start(port: u16) -> Result<Self> {
        Self::with_config(ServerConfig::default().with_port(port))
    }

    /// Starts a server as described by `config`.
    ///
    /// # Errors
    ///
    /// As for [`start`](Self::start).
    pub fn with_config(config: ServerConfig) -> Result<Self> {
        let requested = config.addr();
        let bind_error = |source| HarnessError::Bind {
            addr: requested,
            source,
        };
        let std_listener = std::net::TcpListener::bind(requested).map_err(bind_error)?;
        std_listener.set_nonblocking(true).map_err(bind_error)?;
        let addr = std_listener.local_addr().map_err(bind_error)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| HarnessError::Runtime {
                what: "server runtime",
                source,
            })?;
        let listener = {
            let _entered = runtime.enter();
            TcpListener::from_std(std_listener).map_err(bind_error)?
        };

        let registry = Registry::default();
        let (shutdown, signal) = watch::channel(false);
        let serving = Arc::clone(&registry);
        let thread = std::thread::Builder::new()
            .name(format!("casebook-server-{}", addr.port()))
            .spawn(move || runtime.block_on(accept_loop(listener, serving, signal)))
            .map_err(|source| HarnessError::Runtime {
                what: "server thread",
                source,
            })?;
        tracing::info!(endpoint = %addr, "test server listening");

        Ok(Self {
            addr,
            registry,
            running: Mutex::new(Some(Running { shutdown, thread })),
        })
    }

    /// Registers or replaces the handler for `path`.
    pub fn add_handler<H>(&self, path: impl Into<String>, handler: H)
    where
        H: Handler + Send + Sync + 'static,
    {
        self.add_handlers([(path.into(), SharedHandler::new(handler))]);
    }

    /// Registers or replaces handlers for several paths at once.
    ///
    /// New routes are reachable as soon as this returns. After
    /// [`shutdown`](Self::shutdown) the call is ignored.
    pub fn add_handlers<I, P>(&self, handlers: I)
    where
        I: IntoIterator<Item = (P, SharedHandler)>,
        P: Into<String>,
    {
        if !self.is_listening() {
            tracing::warn!(endpoint = %self.addr, "handlers added after shutdown ignored");
            return;
        }
        let mut registry = self.registry.write();
        for (path, handler) in handlers {
            let route = path.into();
            tracing::debug!(endpoint = %self.addr, path = %route, "handler registered");
            registry.insert(route, handler);
        }
    }

    /// Unregisters the handler for `path`, returning whether one existed.
    pub fn remove_handler(&self, path: &str) -> bool {
        let removed = self.registry.write().remove(path).is_some();
        if removed {
            tracing::debug!(endpoint = %self.addr, path, "handler removed");
        }
        removed
    }

    /// Registered paths, sorted.
    #[must_use]
    pub fn handler_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.registry.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Socket address the server is bound to.
    #[must_use]
    pub const fn endpoint(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the server, such as `http://127.0.0.1:41234`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Returns `true` until [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.running.lock().is_some()
    }

    /// An executor that sends specs to this server over the network.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn executor<'t>(&self, case: &'t TestCase) -> Result<HttpExecutor<'t, Remote>> {
        serve_endpoint(case, &self.url())
    }

    /// Stops accepting connections, waits for in-flight requests and
    /// releases the port. Calling it again does nothing.
    pub fn shutdown(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };
        running.shutdown.send_replace(true);
        if running.thread.join().is_err() {
            tracing::error!(endpoint = %self.addr, "server thread panicked");
        }
        tracing::info!(endpoint = %self.addr, "test server shut down");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TestServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestServer")
            .field("endpoint", &self.addr)
            .field("listening", &self.is_listening())
            .field("paths", &self.handler_paths())
            .finish()
    }
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! expands to a modulo for branch fairness"
)]
async fn accept_loop(listener: TcpListener, registry: Registry, mut signal: watch::Receiver<bool>) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_connection(
                        stream,
                        peer,
                        Arc::clone(&registry),
                        signal.clone(),
                    ));
                }
                Err(err) => tracing::warn!(error = %err, "failed to accept connection"),
            },
            _ = signal.changed() => break,
        }
    }
    drop(listener);
    while connections.join_next().await.is_some() {}
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! expands to a modulo for branch fairness"
)]
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Registry,
    mut signal: watch::Receiver<bool>,
) {
    let service = service_fn(move |request| respond(Arc::clone(&registry), request));
    let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);
    let served = tokio::select! {
        finished = connection.as_mut() => finished,
        _ = signal.changed() => {
            connection.as_mut().graceful_shutdown();
            connection.as_mut().await
        }
    };
    if let Err(err) = served {
        tracing::warn!(%peer, error = %err, "connection error");
    }
}

async fn respond(
    registry: Registry,
    incoming_request: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let (parts, incoming) = incoming_request.into_parts();
    let body = match incoming.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read request body");
            return Ok(plain(StatusCode::BAD_REQUEST, "unreadable request body"));
        }
    };
    let request = Request::from_parts(parts, body);
    let path = request.uri().path();
    tracing::debug!(method = %request.method(), path, "request received");
    let Some(handler) = registry.read().get(path).cloned() else {
        return Ok(plain(StatusCode::NOT_FOUND, "no handler registered"));
    };
    let handled = tokio::task::spawn_blocking(move || {
        let mut recorder = ResponseRecorder::new();
        handler.handle(&request, &mut recorder);
        recorder.finish()
    })
    .await;
    Ok(match handled {
        Ok(recorded) => {
            let mut response = Response::new(Full::new(recorded.body));
            *response.status_mut() = recorded.status;
            *response.headers_mut() = recorded.headers;
            response
        }
        Err(err) => {
            tracing::warn!(error = %err, "handler did not complete");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "handler panicked")
        }
    })
}

fn plain(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}
