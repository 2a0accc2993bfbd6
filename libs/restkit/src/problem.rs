//! Problem constructors and request trace extraction.

use axum::http::HeaderMap;
use http::StatusCode;

pub use restkit_errors::{APPLICATION_PROBLEM_JSON, Problem, finalize};

pub fn bad_request(detail: impl Into<String>) -> Problem {
    Problem::from_status(StatusCode::BAD_REQUEST, detail)
}

pub fn not_found(detail: impl Into<String>) -> Problem {
    Problem::from_status(StatusCode::NOT_FOUND, detail)
}

pub fn method_not_allowed(detail: impl Into<String>) -> Problem {
    Problem::from_status(StatusCode::METHOD_NOT_ALLOWED, detail)
}

pub fn unsupported_media_type(detail: impl Into<String>) -> Problem {
    Problem::from_status(StatusCode::UNSUPPORTED_MEDIA_TYPE, detail)
}

pub fn internal_error(detail: impl Into<String>) -> Problem {
    Problem::from_status(StatusCode::INTERNAL_SERVER_ERROR, detail)
}

/// Trace id of the inbound request.
///
/// Checks `x-trace-id`, then `x-request-id`, then the trace-id segment of a
/// W3C `traceparent`, then the current tracing span.
pub fn extract_trace_id(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("x-trace-id")
        .or_else(|| header("x-request-id"))
        .map(ToOwned::to_owned)
        .or_else(|| {
            header("traceparent").map(|tp| tp.split('-').nth(1).unwrap_or(tp).to_owned())
        })
        .or_else(|| {
            tracing::Span::current()
                .id()
                .map(|id| id.into_u64().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::response::IntoResponse;

    #[test]
    fn constructors_use_canonical_titles() {
        assert_eq!(bad_request("x").title, "Bad Request");
        assert_eq!(not_found("x").status, StatusCode::NOT_FOUND);
        assert_eq!(method_not_allowed("x").title, "Method Not Allowed");
        assert_eq!(unsupported_media_type("x").title, "Unsupported Media Type");
        assert_eq!(internal_error("x").title, "Internal Server Error");
    }

    #[test]
    fn problem_response_is_problem_json() {
        let resp = not_found("user 7 not found").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers().get(axum::http::header::CONTENT_TYPE).unwrap(),
            APPLICATION_PROBLEM_JSON
        );
    }

    #[test]
    fn trace_id_header_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );
        assert_eq!(
            extract_trace_id(&headers).as_deref(),
            Some("4bf92f3577b34da6a3ce929d0e0e4736")
        );

        headers.insert("x-request-id", HeaderValue::from_static("req-1"));
        assert_eq!(extract_trace_id(&headers).as_deref(), Some("req-1"));

        headers.insert("x-trace-id", HeaderValue::from_static("trace-1"));
        assert_eq!(extract_trace_id(&headers).as_deref(), Some("trace-1"));
    }
}
