//! Writing a problem onto an HTTP response.

use http::header::{CONTENT_TYPE, HeaderValue};
use http::{HeaderName, Response, StatusCode};

use crate::error::CodecError;
use crate::problem::{APPLICATION_PROBLEM_JSON, Problem};

/// Minimal response surface a problem can be rendered onto.
pub trait ResponseSink {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    fn set_status(&mut self, status: StatusCode);

    /// # Errors
    /// Returns the I/O error reported by the underlying writer.
    fn write_body(&mut self, body: &[u8]) -> std::io::Result<()>;
}

impl ResponseSink for Response<Vec<u8>> {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers_mut().insert(name, value);
    }

    fn set_status(&mut self, status: StatusCode) {
        *self.status_mut() = status;
    }

    fn write_body(&mut self, body: &[u8]) -> std::io::Result<()> {
        self.body_mut().extend_from_slice(body);
        Ok(())
    }
}

impl Problem {
    /// Render as `application/problem+json`.
    ///
    /// Sets the content type, writes the status unless it is zero, then writes
    /// the JSON body. Marshaling applies the type and title defaults to `self`.
    ///
    /// # Errors
    /// Returns a status 500 `Problem` if the status is not a valid HTTP code,
    /// or if encoding or writing the body fails.
    pub fn render<S>(&mut self, sink: &mut S) -> Result<(), Problem>
    where
        S: ResponseSink + ?Sized,
    {
        sink.set_header(
            CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        if self.status() != 0 {
            let status = StatusCode::from_u16(self.status()).map_err(Problem::from_error)?;
            sink.set_status(status);
        }
        let body = self.to_json()?;
        sink.write_body(&body).map_err(|err| Problem::from_error(CodecError::Io(err)))
    }

    /// Render into a fresh `http::Response`.
    ///
    /// # Errors
    /// Same as [`Problem::render`].
    pub fn to_response(&mut self) -> Result<Response<Vec<u8>>, Problem> {
        let mut response = Response::new(Vec::new());
        self.render(&mut response)?;
        Ok(response)
    }
}

/// Axum integration: make Problem directly usable as a response
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Problem {
    fn into_response(mut self) -> axum::response::Response {
        match self.to_response() {
            Ok(response) => response.map(axum::body::Body::from),
            Err(failure) => {
                tracing::error!(error = %failure, problem = %self, "failed to render problem");
                axum::response::IntoResponse::into_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    /// Sink that records calls and can be told to fail writes.
    #[derive(Default)]
    struct RecordingSink {
        headers: Vec<(HeaderName, HeaderValue)>,
        status: Option<StatusCode>,
        body: Vec<u8>,
        fail_writes: bool,
    }

    impl ResponseSink for RecordingSink {
        fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
            self.headers.push((name, value));
        }

        fn set_status(&mut self, status: StatusCode) {
            self.status = Some(status);
        }

        fn write_body(&mut self, body: &[u8]) -> std::io::Result<()> {
            if self.fail_writes {
                return Err(std::io::Error::other("connection reset"));
            }
            self.body.extend_from_slice(body);
            Ok(())
        }
    }

    #[test]
    fn render_sets_content_type_status_and_body() {
        let mut sink = RecordingSink::default();
        let mut p = Problem::new(404, "No such user").with_instance("/users/7");
        p.render(&mut sink).unwrap();

        assert_eq!(sink.headers.len(), 1);
        assert_eq!(sink.headers[0].0, CONTENT_TYPE);
        assert_eq!(sink.headers[0].1, APPLICATION_PROBLEM_JSON);
        assert_eq!(sink.status, Some(StatusCode::NOT_FOUND));

        let body: Value = serde_json::from_slice(&sink.body).unwrap();
        assert_eq!(
            body,
            json!({
                "type": "about:blank",
                "title": "Not Found",
                "status": 404,
                "detail": "No such user",
                "instance": "/users/7",
            })
        );
    }

    #[test]
    fn zero_status_is_not_written() {
        let mut sink = RecordingSink::default();
        Problem::new(0, "no status").render(&mut sink).unwrap();
        assert!(sink.status.is_none());
        assert!(!sink.body.is_empty());
    }

    #[test]
    fn invalid_status_fails() {
        let mut sink = RecordingSink::default();
        let err = Problem::new(42, "weird").render(&mut sink).unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(sink.body.is_empty());
    }

    #[test]
    fn write_failure_propagates() {
        let mut sink = RecordingSink {
            fail_writes: true,
            ..RecordingSink::default()
        };
        let err = Problem::new(400, "bad").render(&mut sink).unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(err.detail.contains("connection reset"));
    }

    #[test]
    fn to_response_builds_http_response() {
        let resp = Problem::new(409, "Email already exists").to_response().unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some(APPLICATION_PROBLEM_JSON)
        );
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["title"], "Conflict");
    }

    #[cfg(feature = "axum")]
    #[test]
    fn problem_into_response_sets_status_and_content_type() {
        use axum::response::IntoResponse;

        let p = Problem::new(400, "invalid payload");
        let resp = p.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let ct = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert_eq!(ct, APPLICATION_PROBLEM_JSON);
    }
}
