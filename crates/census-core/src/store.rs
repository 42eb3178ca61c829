//! The `PersonStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `census-store-sqlite`).
//! Higher layers depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::person::Person;

/// Page size used when a filter does not name one.
pub const DEFAULT_LIMIT: usize = 10;

/// Page sizes a caller may ask for.
pub const ALLOWED_LIMITS: [usize; 4] = [10, 30, 50, 100];

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`PersonStore::list`].
///
/// Name parts match case-insensitively by prefix; the enrichment fields
/// match exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
  pub name:        Option<String>,
  pub surname:     Option<String>,
  pub patronymic:  Option<String>,
  pub age:         Option<i32>,
  pub gender:      Option<String>,
  pub nationality: Option<String>,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

impl PersonFilter {
  pub fn limit(&self) -> usize { self.limit.unwrap_or(DEFAULT_LIMIT) }

  pub fn offset(&self) -> usize { self.offset.unwrap_or(0) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a person store backend.
///
/// "Not found" is reported through `Option`/`bool` results rather than the
/// error type, so callers can tell it apart from I/O failures without
/// knowing the backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PersonStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist an enriched person and return it with its new `id`. Any `id`
  /// already on the input is ignored.
  fn create(
    &self,
    person: Person,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Retrieve a live (not deleted) person. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// List live people matching `filter`, oldest first.
  fn list<'a>(
    &'a self,
    filter: &'a PersonFilter,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + 'a;

  /// Overwrite every field of the person identified by `person.id`.
  /// Returns `None` if there is no such live person.
  fn update(
    &self,
    person: Person,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Delete a person. Returns `false` if there was no such live person.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
