//! JSON REST API for the census person store.
//!
//! Exposes an axum [`Router`] backed by any [`census_service::People`]
//! implementation. Tracing, timeouts and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = census_api::api_router(Arc::new(service));
//! ```

pub mod error;
pub mod person;

use std::sync::Arc;

use axum::{Router, routing::get};
use census_service::People;

pub use error::ApiError;

/// Build the API router for `people`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<P>(people: Arc<P>) -> Router<()>
where
  P: People + 'static,
{
  Router::new()
    .route("/person", get(person::list::<P>).post(person::create::<P>))
    .route(
      "/person/{id}",
      get(person::get_one::<P>)
        .patch(person::update::<P>)
        .delete(person::delete::<P>),
    )
    .with_state(people)
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use census_enrich::{Api, Enricher, RateLimit, stub::StaticFetcher};
  use census_service::{PeopleService, cache::MemoryCache};
  use census_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  type TestService = PeopleService<SqliteStore, MemoryCache, StaticFetcher>;

  async fn service_with(nationality: StaticFetcher) -> Arc<TestService> {
    let service = PeopleService::builder()
      .store(SqliteStore::open_in_memory().await.unwrap())
      .cache(MemoryCache::default())
      .enricher(
        Enricher::new(
          StaticFetcher::ok(Api::Age, json!({"age": 30})),
          StaticFetcher::ok(Api::Gender, json!({"gender": "male"})),
          nationality,
        )
        .with_timeout(Duration::from_millis(200)),
      )
      .build()
      .unwrap();
    Arc::new(service)
  }

  async fn service() -> Arc<TestService> {
    service_with(StaticFetcher::ok(Api::Nationality, json!({"nationality": "RU"})))
      .await
  }

  async fn oneshot_raw(
    people: Arc<TestService>,
    method: &str,
    uri: &str,
    body: &str,
  ) -> axum::response::Response {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    api_router(people).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn create_ivan(people: &Arc<TestService>) -> String {
    let resp = oneshot_raw(
      people.clone(),
      "POST",
      "/person",
      r#"{"name":"Ivan","surname":"Petrov"}"#,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await["id"].as_str().unwrap().to_owned()
  }

  // ── Create ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_returns_enriched_person() {
    let people = service().await;
    let resp = oneshot_raw(
      people,
      "POST",
      "/person",
      r#"{"name":"Ivan","surname":"Petrov","patronymic":"Sergeevich"}"#,
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["age"], 30);
    assert_eq!(body["gender"], "male");
    assert_eq!(body["nationality"], "RU");
    assert_eq!(body["patronymic"], "Sergeevich");
    assert!(body["id"].is_string());
  }

  #[tokio::test]
  async fn malformed_body_is_400() {
    let resp = oneshot_raw(service().await, "POST", "/person", "{\"name\":").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["error"].is_string());
  }

  #[tokio::test]
  async fn invalid_input_is_422_with_fields() {
    let resp = oneshot_raw(
      service().await,
      "POST",
      "/person",
      r#"{"name":"Iv4n","surname":""}"#,
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(resp).await;
    assert_eq!(body["fields"]["surname"], "is required");
    assert_eq!(body["fields"]["name"], "must contain only letters");
  }

  #[tokio::test]
  async fn missing_surname_is_422_with_fields() {
    let resp =
      oneshot_raw(service().await, "POST", "/person", r#"{"name":"Ivan"}"#).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(resp).await;
    assert_eq!(body["fields"]["surname"], "is required");
    assert!(body["fields"].get("name").is_none());
  }

  #[tokio::test]
  async fn upstream_failure_is_502_with_retry_after() {
    let failing = StaticFetcher::failing(Api::Nationality, 429, "Request limit reached")
      .with_rate_limit(RateLimit { limit: 1000, remaining: 0, reset: 60 });
    let resp = oneshot_raw(
      service_with(failing).await,
      "POST",
      "/person",
      r#"{"name":"Ivan","surname":"Petrov"}"#,
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(resp.headers()[header::RETRY_AFTER], "60");
    let body = json_body(resp).await;
    assert_eq!(body["api"], "nationalize");
    assert_eq!(body["rate_limit"]["remaining"], 0);
  }

  #[tokio::test]
  async fn enrichment_timeout_is_504() {
    let slow = StaticFetcher::ok(Api::Nationality, json!({"nationality": "RU"}))
      .with_delay(Duration::from_secs(5));
    let resp = oneshot_raw(
      service_with(slow).await,
      "POST",
      "/person",
      r#"{"name":"Ivan","surname":"Petrov"}"#,
    )
    .await;

    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(resp).await["missing"], json!(["nationality"]));
  }

  // ── Read ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn get_one_and_list() {
    let people = service().await;
    let id = create_ivan(&people).await;

    let resp = oneshot_raw(people.clone(), "GET", &format!("/person/{id}"), "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["name"], "Ivan");

    let resp = oneshot_raw(people.clone(), "GET", "/person?name=iv&limit=30", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

    let resp = oneshot_raw(people, "GET", "/person?surname=Sid", "").await;
    assert_eq!(json_body(resp).await, json!([]));
  }

  #[tokio::test]
  async fn bad_list_limit_is_422() {
    let resp = oneshot_raw(service().await, "GET", "/person?limit=7", "").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json_body(resp).await["fields"]["limit"].is_string());
  }

  #[tokio::test]
  async fn unparseable_query_is_400() {
    let resp = oneshot_raw(service().await, "GET", "/person?age=old", "").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unknown_and_malformed_ids() {
    let people = service().await;

    let uri = format!("/person/{}", uuid::Uuid::new_v4());
    let resp = oneshot_raw(people.clone(), "GET", &uri, "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = oneshot_raw(people, "GET", "/person/not-a-uuid", "").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Update / delete ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn patch_updates_fields() {
    let people = service().await;
    let id = create_ivan(&people).await;
    let uri = format!("/person/{id}");

    let resp = oneshot_raw(people.clone(), "PATCH", &uri, r#"{"age":31}"#).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["age"], 31);

    let resp = oneshot_raw(people.clone(), "PATCH", &uri, r#"{"nationality":"rus"}"#).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = oneshot_raw(people, "GET", &uri, "").await;
    assert_eq!(json_body(resp).await["age"], 31);
  }

  #[tokio::test]
  async fn patch_with_unknown_field_is_400() {
    let people = service().await;
    let id = create_ivan(&people).await;
    let uri = format!("/person/{id}");

    let resp =
      oneshot_raw(people.clone(), "PATCH", &uri, r#"{"nationalty":"FR"}"#).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["error"].is_string());

    let resp = oneshot_raw(people, "GET", &uri, "").await;
    assert_eq!(json_body(resp).await["nationality"], "RU");
  }

  #[tokio::test]
  async fn delete_then_404() {
    let people = service().await;
    let id = create_ivan(&people).await;
    let uri = format!("/person/{id}");

    let resp = oneshot_raw(people.clone(), "DELETE", &uri, "").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = oneshot_raw(people.clone(), "DELETE", &uri, "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = oneshot_raw(people, "GET", &uri, "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
