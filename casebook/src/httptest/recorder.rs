//! In-memory response sink handed to handlers.

use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

/// Captures the status, headers and body a handler writes.
///
/// The status defaults to `200 OK`. It is fixed by the first call to
/// [`set_status`](Self::set_status) or the first body write, whichever comes
/// first; later attempts to change it are ignored.
///
/// # Examples
///
/// ```
/// use std::io::Write;
///
/// use casebook::ResponseRecorder;
/// use casebook::http::StatusCode;
///
/// let mut recorder = ResponseRecorder::new();
/// recorder.set_status(StatusCode::ACCEPTED);
/// write!(recorder, "queued").unwrap();
/// recorder.set_status(StatusCode::OK);
/// let response = recorder.finish();
/// assert_eq!(response.status, StatusCode::ACCEPTED);
/// assert_eq!(&response.body[..], b"queued");
/// ```
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status code unless one has already been written.
    pub fn set_status(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(current) if current != status => {
                tracing::warn!(%current, ignored = %status, "superfluous status change ignored");
            }
            Some(_) => {}
        }
    }

    /// Status recorded so far, `200 OK` if none was set.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Replaces the values of header `name` with `value`.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Headers recorded so far.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the recorded headers.
    pub const fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Appends `bytes` to the body, fixing the status.
    pub fn write_body(&mut self, bytes: impl AsRef<[u8]>) {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(bytes.as_ref());
    }

    /// Body written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Freezes the recorder into a response.
    #[must_use]
    pub fn finish(self) -> RecordedResponse {
        RecordedResponse {
            status: self.status.unwrap_or(StatusCode::OK),
            headers: self.headers,
            body: self.body.freeze(),
        }
    }
}

impl io::Write for ResponseRecorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A captured response, whether recorded in-process or read from the
/// network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResponse {
    /// Final status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}
