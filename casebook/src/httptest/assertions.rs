//! Comparison of recorded responses against a spec's expectations.

use std::fmt;

use bytes::Bytes;
use http::StatusCode;

use super::recorder::RecordedResponse;
use super::spec::HttpTestSpec;
use crate::error::Result;

/// One unmet expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMismatch {
    /// The status code differs.
    Status {
        /// Expected status.
        expected: StatusCode,
        /// Received status.
        actual: StatusCode,
    },
    /// An expected header is missing or has other values.
    Header {
        /// Header name as written in the request spec.
        name: String,
        /// Expected value.
        expected: String,
        /// Every value received for the header.
        actual: Vec<String>,
    },
    /// The body differs.
    Body {
        /// Expected body.
        expected: Bytes,
        /// Received body.
        actual: Bytes,
    },
}

impl fmt::Display for HttpMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { expected, actual } => {
                write!(f, "status: expected {expected}, got {actual}")
            }
            Self::Header {
                name,
                expected,
                actual,
            } if actual.is_empty() => {
                write!(f, "header {name}: expected {expected:?}, header missing")
            }
            Self::Header {
                name,
                expected,
                actual,
            } => write!(f, "header {name}: expected {expected:?}, got {actual:?}"),
            Self::Body { expected, actual } => write!(
                f,
                "body: expected {:?}, got {:?}",
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(actual)
            ),
        }
    }
}

/// Lists every expectation of `spec` that `response` does not meet.
///
/// Header names are case-insensitive and values compare exactly. A header
/// with several values passes if any of them matches.
///
/// # Errors
///
/// Returns [`HarnessError::InvalidRequest`](crate::HarnessError::InvalidRequest)
/// when an expected header name is not a valid HTTP header name.
pub fn check(spec: &HttpTestSpec, response: &RecordedResponse) -> Result<Vec<HttpMismatch>> {
    let mut mismatches = Vec::new();
    if let Some(expected) = spec.status
        && expected != response.status
    {
        mismatches.push(HttpMismatch::Status {
            expected,
            actual: response.status,
        });
    }
    for (name, expected) in spec.response_headers.iter().flatten() {
        let header = spec.expected_header_name(name)?;
        let values = response.headers.get_all(&header);
        if values
            .iter()
            .any(|value| value.as_bytes() == expected.as_bytes())
        {
            continue;
        }
        mismatches.push(HttpMismatch::Header {
            name: name.clone(),
            expected: expected.clone(),
            actual: values
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect(),
        });
    }
    if let Some(expected) = &spec.response_body
        && *expected != response.body
    {
        mismatches.push(HttpMismatch::Body {
            expected: expected.clone(),
            actual: response.body.clone(),
        });
    }
    Ok(mismatches)
}

#[cfg(test)]
mod tests {
    use http::header::{CONTENT_TYPE, SET_COOKIE};
    use http::{HeaderMap, HeaderValue};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::error::HarnessError;

    #[fixture]
    fn response() -> RecordedResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.insert("x-extra", HeaderValue::from_static("ignored"));
        RecordedResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(b"hello"),
        }
    }

    #[rstest]
    fn unset_expectations_always_pass(response: RecordedResponse) {
        let spec = HttpTestSpec::get("/");
        assert!(check(&spec, &response).expect("valid spec").is_empty());
    }

    #[rstest]
    fn headers_match_as_a_case_insensitive_subset(response: RecordedResponse) {
        let spec = HttpTestSpec::get("/")
            .expect_header("Content-Type", "text/plain")
            .expect_header("set-cookie", "b=2");
        assert!(check(&spec, &response).expect("valid spec").is_empty());
    }

    #[rstest]
    fn header_values_compare_exactly(response: RecordedResponse) {
        let spec = HttpTestSpec::get("/").expect_header("content-type", "text/plain; charset=utf-8");
        let mismatches = check(&spec, &response).expect("valid spec");
        assert_eq!(
            mismatches,
            [HttpMismatch::Header {
                name: "content-type".into(),
                expected: "text/plain; charset=utf-8".into(),
                actual: vec!["text/plain".into()],
            }]
        );
    }

    #[rstest]
    fn reports_every_mismatch(response: RecordedResponse) {
        let spec = HttpTestSpec::get("/")
            .expect_status(StatusCode::CREATED)
            .expect_header("location", "/items/1")
            .expect_body("goodbye");
        let rendered: Vec<String> = check(&spec, &response)
            .expect("valid spec")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            rendered,
            [
                "status: expected 201 Created, got 200 OK",
                "header location: expected \"/items/1\", header missing",
                "body: expected \"goodbye\", got \"hello\"",
            ]
        );
    }

    #[rstest]
    fn invalid_header_names_are_setup_errors(response: RecordedResponse) {
        let spec = HttpTestSpec::get("/").expect_header("bad header", "x");
        assert!(matches!(
            check(&spec, &response),
            Err(HarnessError::InvalidRequest { .. })
        ));
    }
}
