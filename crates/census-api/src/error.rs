//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! | Error | Status |
//! |-------|--------|
//! | malformed body, query or path | 400 |
//! | unknown person | 404 |
//! | validation failure | 422, with a `fields` map |
//! | enrichment API failure | 502, with `api` and `rate_limit` |
//! | enrichment deadline | 504 |
//! | store, cache or encoding failure | 500 |

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header::RETRY_AFTER},
  response::{IntoResponse, Response},
};
use census_core::validate::ValidationErrors;
use census_enrich::EnrichError;
use census_service::ServiceError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Invalid(ValidationErrors),

  #[error(transparent)]
  Enrichment(EnrichError),

  #[error("internal error: {0}")]
  Internal(#[source] ServiceError),
}

impl From<ServiceError> for ApiError {
  fn from(e: ServiceError) -> Self {
    match e {
      ServiceError::Invalid(fields) => Self::Invalid(fields),
      ServiceError::NotFound(id) => Self::NotFound(format!("person {id}")),
      ServiceError::Enrichment(e) => Self::Enrichment(e),
      other => Self::Internal(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": format!("not found: {m}") })))
          .into_response()
      }
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Invalid(fields) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": "validation failed", "fields": fields })),
      )
        .into_response(),
      ApiError::Enrichment(e) => enrichment_response(&e),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": e.to_string() })),
        )
          .into_response()
      }
    }
  }
}

fn enrichment_response(e: &EnrichError) -> Response {
  let missing = e.missing();
  if e.is_timeout() {
    tracing::warn!(error = %e, "enrichment timed out");
    return (
      StatusCode::GATEWAY_TIMEOUT,
      Json(json!({ "error": e.to_string(), "missing": missing })),
    )
      .into_response();
  }

  tracing::warn!(error = %e, "enrichment failed");
  let rate_limit = e.rate_limit();
  let body = json!({
    "error": e.to_string(),
    "api": e.api(),
    "missing": missing,
    "rate_limit": rate_limit,
  });
  let mut response = (StatusCode::BAD_GATEWAY, Json(body)).into_response();
  if let Some(limit) = rate_limit {
    response
      .headers_mut()
      .insert(RETRY_AFTER, HeaderValue::from(limit.reset.max(0)));
  }
  response
}
