//! Middleware wrapped around the API router.
//!
//! Every request carries an `x-request-id`: the caller's, or a fresh UUID.
//! The id is recorded on the request's tracing span and echoed on the
//! response.

use std::time::Duration;

use axum::{
  Router,
  body::Body,
  http::{HeaderName, Request},
};
use tower_http::{
  request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
  timeout::TimeoutLayer,
  trace::TraceLayer,
};
use tracing::Span;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn request_span(request: &Request<Body>) -> Span {
  let request_id = request
    .headers()
    .get(&REQUEST_ID)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("-");
  tracing::info_span!(
    "request",
    method = %request.method(),
    uri = %request.uri(),
    request_id,
  )
}

/// Apply request ids, tracing and the per-request timeout to `router`.
pub fn layered(router: Router, timeout: Duration) -> Router {
  // Added last runs first: the id is set before the trace span opens.
  router
    .layer(TimeoutLayer::new(timeout))
    .layer(PropagateRequestIdLayer::new(REQUEST_ID))
    .layer(TraceLayer::new_for_http().make_span_with(request_span))
    .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
}

#[cfg(test)]
mod tests {
  use axum::{http::StatusCode, routing::get};
  use tower::ServiceExt as _;

  use super::*;

  fn app() -> Router {
    layered(
      Router::new().route("/", get(|| async { "ok" })),
      Duration::from_secs(5),
    )
  }

  #[tokio::test]
  async fn response_gets_a_fresh_request_id() {
    let resp = app()
      .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
      .await
      .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let id = resp.headers().get(&REQUEST_ID).unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
  }

  #[tokio::test]
  async fn caller_request_id_is_echoed() {
    let resp = app()
      .oneshot(
        Request::builder()
          .uri("/")
          .header(&REQUEST_ID, "abc-123")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();

    assert_eq!(resp.headers().get(&REQUEST_ID).unwrap(), "abc-123");
  }
}
