//! Handlers for `/person` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/person` | Filters: `name`, `surname`, `patronymic` (prefix), `age`, `gender`, `nationality`, `limit`, `offset` |
//! | `POST`   | `/person` | Body: `{"name":"Ivan","surname":"Petrov"}` |
//! | `GET`    | `/person/{id}` | 404 if not found |
//! | `PATCH`  | `/person/{id}` | Body: any subset of the person fields |
//! | `DELETE` | `/person/{id}` | 204 on success |

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use census_core::{
  person::{NewPerson, Person, PersonPatch},
  store::PersonFilter,
};
use census_service::People;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
  payload
    .map(|Json(value)| value)
    .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn path_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
  id.map(|Path(id)| id)
    .map_err(|e| ApiError::BadRequest(e.body_text()))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub name:        Option<String>,
  pub surname:     Option<String>,
  pub patronymic:  Option<String>,
  pub age:         Option<i32>,
  pub gender:      Option<String>,
  pub nationality: Option<String>,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

impl From<ListParams> for PersonFilter {
  fn from(p: ListParams) -> Self {
    PersonFilter {
      name:        p.name,
      surname:     p.surname,
      patronymic:  p.patronymic,
      age:         p.age,
      gender:      p.gender,
      nationality: p.nationality,
      limit:       p.limit,
      offset:      p.offset,
    }
  }
}

/// `GET /person[?name=..&limit=..]`
pub async fn list<P: People>(
  State(people): State<Arc<P>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Person>>, ApiError> {
  let Query(params) =
    params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let found = people.list(params.into()).await?;
  Ok(Json(found))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /person`. Enriches before saving; 201 with the stored person.
pub async fn create<P: People>(
  State(people): State<Arc<P>>,
  payload: Result<Json<NewPerson>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let input = body(payload)?;
  let person = people.create(input).await?;
  Ok((StatusCode::CREATED, Json(person)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /person/{id}`
pub async fn get_one<P: People>(
  State(people): State<Arc<P>>,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Person>, ApiError> {
  let person = people.get(path_id(id)?).await?;
  Ok(Json(person))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /person/{id}`
pub async fn update<P: People>(
  State(people): State<Arc<P>>,
  id: Result<Path<Uuid>, PathRejection>,
  payload: Result<Json<PersonPatch>, JsonRejection>,
) -> Result<Json<Person>, ApiError> {
  let id = path_id(id)?;
  let patch = body(payload)?;
  let person = people.update(id, patch).await?;
  Ok(Json(person))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /person/{id}`
pub async fn delete<P: People>(
  State(people): State<Arc<P>>,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
  people.delete(path_id(id)?).await?;
  Ok(StatusCode::NO_CONTENT)
}
