//! Error types produced while setting up sub-cases and HTTP scenarios.
//!
//! Every variant describes a *setup* problem: the test itself is malformed
//! or its environment is unusable. Behavioural mismatches are never errors;
//! they are recorded as failures on the owning sub-case instead.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised while preparing or dispatching a test step.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HarnessError {
    /// The number of supplied values does not match the callable's signature.
    #[error("expected {expected} argument(s) for '{callable}', got {actual}")]
    Arity {
        /// Name of the wrapped callable.
        callable: String,
        /// Number of parameters the callable declares (receiver included).
        expected: usize,
        /// Number of values that were supplied.
        actual: usize,
    },

    /// A supplied value has a different type from the declared parameter.
    #[error("argument {index} of '{callable}' has type {actual}, expected {expected}")]
    ArgumentType {
        /// Name of the wrapped callable.
        callable: String,
        /// Zero-based position of the offending value; `0` is the receiver
        /// for method calls.
        index: usize,
        /// Declared parameter type.
        expected: &'static str,
        /// Type of the supplied value.
        actual: &'static str,
    },

    /// A request could not be assembled from its declarative description.
    #[error("invalid request for '{target}': {message}")]
    InvalidRequest {
        /// Method and path of the offending spec.
        target: String,
        /// Explanation of what could not be parsed.
        message: String,
    },

    /// The test server could not bind its listener.
    #[error("failed to bind test server on {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// An async runtime or background thread could not be created.
    #[error("failed to start {what}: {source}")]
    Runtime {
        /// Component that failed to start.
        what: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A request sent over the network did not complete.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Fully resolved request URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// A value could not be serialised as JSON.
    #[error("failed to encode JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// An environment variable name cannot be set on this platform.
    #[error("invalid environment variable name {key:?}")]
    InvalidEnvKey {
        /// Rejected key.
        key: String,
    },
}

impl HarnessError {
    /// Returns `true` when the error stems from a malformed call rather than
    /// from the host environment.
    ///
    /// # Examples
    ///
    /// ```
    /// use casebook::HarnessError;
    ///
    /// let err = HarnessError::Arity { callable: "add".into(), expected: 2, actual: 1 };
    /// assert!(err.is_signature_mismatch());
    /// ```
    #[must_use]
    pub const fn is_signature_mismatch(&self) -> bool {
        matches!(self, Self::Arity { .. } | Self::ArgumentType { .. })
    }
}

/// Convenience alias for results carrying a [`HarnessError`].
pub type Result<T> = std::result::Result<T, HarnessError>;
