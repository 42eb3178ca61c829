//! Error types for `census-service`.

use census_core::validate::ValidationErrors;
use census_enrich::EnrichError;
use thiserror::Error;
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ServiceError {
  #[error(transparent)]
  Invalid(#[from] ValidationErrors),

  #[error("person not found: {0}")]
  NotFound(Uuid),

  #[error(transparent)]
  Enrichment(#[from] EnrichError),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("cache error: {0}")]
  Cache(#[source] BoxError),

  #[error("encoding error: {0}")]
  Encode(#[from] census_core::Error),
}

impl ServiceError {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub(crate) fn cache(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Cache(Box::new(e))
  }
}

/// A [`ServiceBuilder`](crate::ServiceBuilder) was finished without a
/// required dependency.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
  #[error("missing required dependency `{0}`")]
  Missing(&'static str),
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
