//! Mock request dispatch: rule selection, latency injection, and
//! response synthesis.

use crate::config::{Config, ResponseBody, ResponseSpec};
use crate::delay::DelaySampler;
use crate::matcher;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared state for all request handlers.
///
/// The configuration is immutable after startup, so it is shared without
/// further synchronization; the delay sampler carries the only lock.
pub struct AppState {
    pub config: Config,
    pub sampler: DelaySampler,
}

impl AppState {
    /// Build state with an OS-seeded delay sampler.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sampler: DelaySampler::from_entropy(),
        }
    }

    /// Build state with an injected sampler (deterministic in tests).
    pub fn with_sampler(config: Config, sampler: DelaySampler) -> Self {
        Self { config, sampler }
    }
}

/// Handle one mock request end to end.
///
/// Buffers the body once, selects the first matching rule, applies the
/// configured delay, and synthesizes the response. No match yields a 404
/// with an empty body.
pub async fn dispatch(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    // Buffer the body up front; a failed read counts as a body-predicate
    // failure, not a transport error.
    let body = to_bytes(body, usize::MAX).await.ok();

    let method = parts.method.as_str();
    let path = parts.uri.path();
    let query = parts.uri.query().unwrap_or("");

    let Some(rule) = matcher::find_match(
        &state.config.requests,
        method,
        path,
        query,
        &parts.headers,
        body.as_deref(),
    ) else {
        warn!(method, path, "no matching rule");
        return StatusCode::NOT_FOUND.into_response();
    };

    info!(method, path, "request matched rule");

    if let Some(delay) = &rule.response_delay {
        let duration = state.sampler.sample(delay);
        if !duration.is_zero() {
            debug!(delay_ms = duration.as_millis() as u64, "applying response delay");
            // If the client disconnects the connection task is dropped,
            // which cancels this sleep and suppresses the response.
            tokio::time::sleep(duration).await;
        }
    }

    synthesize(&rule.response)
}

/// Serialize a response spec onto the wire: headers, then status, then
/// body.
///
/// A string body is written verbatim; a structured body is serialized as
/// JSON. A serialization failure at this point cannot become a different
/// response, so it is logged and the response goes out with the
/// configured status and headers and an empty body.
pub fn synthesize(spec: &ResponseSpec) -> Response {
    let mut builder = Response::builder().status(spec.status_code);
    for (name, value) in &spec.headers {
        builder = builder.header(name, value);
    }

    let bytes = match &spec.body {
        None => Vec::new(),
        Some(ResponseBody::Text(text)) => text.clone().into_bytes(),
        Some(ResponseBody::Json(value)) => match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(%err, "failed to serialize response body");
                Vec::new()
            }
        },
    };

    builder.body(Body::from(bytes)).unwrap_or_else(|err| {
        error!(%err, "failed to build response");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use std::time::Instant;
    use tower::util::ServiceExt;

    fn test_app(yaml: &str) -> Router {
        let config = Config::from_yaml(yaml).unwrap();
        let state = Arc::new(AppState::with_sampler(config, DelaySampler::seeded(7)));
        Router::new().fallback(dispatch).with_state(state)
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn synthesize_text_body_verbatim() {
        let spec = ResponseSpec {
            status_code: 200,
            headers: Default::default(),
            body: Some(ResponseBody::Text("pong".to_string())),
        };
        let response = synthesize(&spec);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn synthesize_sets_headers_and_status() {
        let spec = ResponseSpec {
            status_code: 201,
            headers: [("X-Test".to_string(), "yes".to_string())].into(),
            body: None,
        };

        let response = synthesize(&spec);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("X-Test").unwrap(), "yes");
    }

    #[tokio::test]
    async fn synthesize_absent_body_writes_nothing() {
        let response = synthesize(&ResponseSpec::default());
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn synthesize_json_body_serialized() {
        let spec = ResponseSpec {
            status_code: 200,
            headers: Default::default(),
            body: Some(ResponseBody::Json(serde_json::json!({"message": "ok"}))),
        };
        let body = body_string(synthesize(&spec)).await;
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["message"], "ok");
    }

    #[tokio::test]
    async fn dispatch_matched_rule() {
        let app = test_app(
            r#"
requests:
  - path: /ping
    method: GET
    response:
      status-code: 200
      body: pong
"#,
        );

        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "pong");
    }

    #[tokio::test]
    async fn dispatch_no_match_is_404_with_empty_body() {
        let app = test_app(
            r#"
requests:
  - path: /ping
"#,
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn dispatch_matches_on_body_pattern() {
        let app = test_app(
            r#"
requests:
  - path: /users
    method: POST
    body: "\"name\""
    response:
      status-code: 201
"#,
        );

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users")
                    .body(Body::from(r#"{"name": "John"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users")
                    .body(Body::from(r#"{"id": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dispatch_applies_configured_delay() {
        let app = test_app(
            r#"
requests:
  - path: /slow
    responseDelay:
      min: 40
      max: 40
    response:
      body: done
"#,
        );

        let start = Instant::now();
        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(start.elapsed() >= std::time::Duration::from_millis(40));
    }
}
