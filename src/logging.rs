//! Request/response logging middleware.
//!
//! A transparent wrapper around the mock dispatch path: both bodies are
//! buffered, logged, and replayed so downstream consumers see the exact
//! same bytes.

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::borrow::Cow;
use std::net::SocketAddr;
use tracing::info;

/// The health endpoint stays out of the traffic log.
const HEALTH_PATH: &str = "/health";

/// Log every request/response pair flowing through the mock handler.
pub async fn log_traffic(req: Request, next: Next) -> Response {
    if req.uri().path() == HEALTH_PATH {
        return next.run(req).await;
    }

    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    let (parts, body) = req.into_parts();
    let method = parts.method.clone();
    let uri = parts.uri.clone();
    let request_headers = format_headers(&parts.headers);

    // Reading the body consumes the stream; replay the buffered bytes for
    // the handler.
    let request_body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let req = Request::from_parts(parts, Body::from(request_body.clone()));

    let response = next.run(req).await;

    let (parts, body) = response.into_parts();
    let response_body = to_bytes(body, usize::MAX).await.unwrap_or_default();

    info!(
        remote = remote.as_deref().unwrap_or("-"),
        method = %method,
        uri = %uri,
        request_headers = %request_headers,
        request_body = %body_text(&request_body),
        status = parts.status.as_u16(),
        response_headers = %format_headers(&parts.headers),
        response_body = %body_text(&response_body),
        "handled request"
    );

    Response::from_parts(parts, Body::from(response_body))
}

fn format_headers(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for (name, value) in headers {
        if !out.is_empty() {
            out.push_str(", ");
        }
        out.push_str(name.as_str());
        out.push_str(": ");
        out.push_str(value.to_str().unwrap_or("<binary>"));
    }
    out
}

fn body_text(bytes: &[u8]) -> Cow<'_, str> {
    if bytes.is_empty() {
        Cow::Borrowed("(empty)")
    } else {
        String::from_utf8_lossy(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::middleware;
    use axum::routing::post;
    use axum::Router;
    use tower::util::ServiceExt;

    /// Echoes the request body so the test can verify both directions
    /// survive the buffering round-trip.
    async fn echo(body: axum::body::Bytes) -> Vec<u8> {
        body.to_vec()
    }

    fn echo_app() -> Router {
        Router::new()
            .route("/echo", post(echo))
            .layer(middleware::from_fn(log_traffic))
    }

    #[tokio::test]
    async fn bodies_survive_the_middleware() {
        let app = echo_app();
        let payload = r#"{"name": "John"}"#;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), payload.as_bytes());
    }

    #[tokio::test]
    async fn empty_body_passes_through() {
        let app = echo_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn format_headers_joins_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        assert_eq!(format_headers(&headers), "content-type: text/plain");
        assert_eq!(format_headers(&HeaderMap::new()), "");
    }

    #[test]
    fn empty_body_logs_placeholder() {
        assert_eq!(body_text(b""), "(empty)");
        assert_eq!(body_text(b"hi"), "hi");
    }
}
