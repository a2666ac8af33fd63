//! Canned handlers for common fixed responses.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, StatusCode};
use serde::Serialize;

use crate::error::Result;
use crate::httptest::{ResponseRecorder, SharedHandler};

fn fixed(status: StatusCode, content_type: Option<&'static str>, body: Bytes) -> SharedHandler {
    SharedHandler::new(move |_: &Request<Bytes>, response: &mut ResponseRecorder| {
        response.set_status(status);
        if let Some(kind) = content_type {
            response.set_header(CONTENT_TYPE, HeaderValue::from_static(kind));
        }
        response.write_body(&body);
    })
}

/// Answers every request with `status` and no body.
#[must_use]
pub fn empty_response(status: StatusCode) -> SharedHandler {
    fixed(status, None, Bytes::new())
}

/// Answers every request with `status` and a plain-text `body`.
#[must_use]
pub fn string_response(status: StatusCode, body: impl Into<String>) -> SharedHandler {
    fixed(
        status,
        Some("text/plain; charset=utf-8"),
        Bytes::from(body.into()),
    )
}

/// Answers every request with `status` and `value` encoded as JSON.
///
/// ```
/// use casebook::server::json_response;
/// use casebook::{Bytes, Handler, ResponseRecorder};
/// use casebook::http::{Request, StatusCode};
///
/// let handler = json_response(StatusCode::OK, &["a", "b"]).unwrap();
/// let mut recorder = ResponseRecorder::new();
/// handler.handle(&Request::new(Bytes::new()), &mut recorder);
/// assert_eq!(recorder.body(), br#"["a","b"]"#);
/// ```
///
/// # Errors
///
/// Returns [`HarnessError::Json`](crate::HarnessError::Json) when `value`
/// cannot be serialised.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<SharedHandler> {
    let body = serde_json::to_vec(value)?;
    Ok(fixed(status, Some("application/json"), Bytes::from(body)))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::httptest::Handler;

    fn respond(handler: &SharedHandler) -> crate::RecordedResponse {
        let mut recorder = ResponseRecorder::new();
        handler.handle(&Request::new(Bytes::new()), &mut recorder);
        recorder.finish()
    }

    #[rstest]
    #[case(StatusCode::NO_CONTENT)]
    #[case(StatusCode::NOT_FOUND)]
    fn empty_responses_carry_only_a_status(#[case] status: StatusCode) {
        let response = respond(&empty_response(status));
        assert_eq!(response.status, status);
        assert!(response.body.is_empty());
        assert!(response.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn string_responses_are_plain_text() {
        let response = respond(&string_response(StatusCode::OK, "hi"));
        assert_eq!(response.body, Bytes::from_static(b"hi"));
        assert_eq!(
            response.headers.get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/plain; charset=utf-8"))
        );
    }

    #[test]
    fn json_responses_are_reusable() {
        let handler =
            json_response(StatusCode::CREATED, &serde_json::json!({ "id": 1 })).expect("encodable");
        for _ in 0..2 {
            let response = respond(&handler);
            assert_eq!(response.status, StatusCode::CREATED);
            assert_eq!(response.body, Bytes::from_static(br#"{"id":1}"#));
        }
    }
}
