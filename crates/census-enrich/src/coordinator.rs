//! Concurrent enrichment of one name.
//!
//! [`Enricher::lookup`] starts the age, gender and nationality lookups at
//! once and collects their fields. The first failure cancels the remaining
//! lookups; the call returns only after every lookup has stopped. An overall
//! deadline bounds the whole call.

use std::{fmt, time::Duration};

use census_core::person::Person;
use futures::{StreamExt, stream::FuturesUnordered};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;

use crate::fetcher::{Api, FetchError, Fetcher, RateLimit};

/// Overall deadline for one lookup.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

// ─── Fields ──────────────────────────────────────────────────────────────────

/// A person field filled in by enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
  Age,
  Gender,
  Nationality,
}

impl Field {
  pub const ALL: [Field; 3] = [Field::Age, Field::Gender, Field::Nationality];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Age => "age",
      Self::Gender => "gender",
      Self::Nationality => "nationality",
    }
  }

  /// The API that infers this field.
  pub fn api(self) -> Api {
    match self {
      Self::Age => Api::Age,
      Self::Gender => Api::Gender,
      Self::Nationality => Api::Nationality,
    }
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Enrichment ──────────────────────────────────────────────────────────────

/// The inferred fields for one name. Complete when all three are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
  #[serde(default)]
  pub age:         Option<i32>,
  #[serde(default)]
  pub gender:      Option<String>,
  #[serde(default)]
  pub nationality: Option<String>,
}

impl Enrichment {
  pub fn is_complete(&self) -> bool { self.missing().is_empty() }

  /// Fields not yet filled in, in [`Field::ALL`] order.
  pub fn missing(&self) -> Vec<Field> {
    Field::ALL
      .into_iter()
      .filter(|field| match field {
        Field::Age => self.age.is_none(),
        Field::Gender => self.gender.is_none(),
        Field::Nationality => self.nationality.is_none(),
      })
      .collect()
  }

  /// Keep only `field`, dropping anything else the payload carried.
  fn only(self, field: Field) -> Self {
    match field {
      Field::Age => Self { age: self.age, ..Self::default() },
      Field::Gender => Self { gender: self.gender, ..Self::default() },
      Field::Nationality => {
        Self { nationality: self.nationality, ..Self::default() }
      }
    }
  }

  /// Fill the fields still empty here from `other`. Fields already set are
  /// never overwritten.
  fn merge(&mut self, other: Self) {
    if self.age.is_none() {
      self.age = other.age;
    }
    if self.gender.is_none() {
      self.gender = other.gender;
    }
    if self.nationality.is_none() {
      self.nationality = other.nationality;
    }
  }

  /// Write the inferred fields onto `person`. Name parts are untouched.
  pub fn apply(self, person: &mut Person) {
    person.age = self.age;
    person.gender = self.gender;
    person.nationality = self.nationality;
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EnrichErrorKind {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error("enrichment did not finish within {0:?}")]
  Timeout(Duration),

  #[error("{field} payload is unusable: {reason}")]
  Payload { field: Field, reason: String },
}

/// A failed lookup, with whatever fields were collected before it stopped.
#[derive(Debug, Error)]
#[error("enriching {name:?} failed: {kind}")]
pub struct EnrichError {
  pub name:    String,
  pub kind:    EnrichErrorKind,
  pub partial: Enrichment,
}

impl EnrichError {
  pub fn is_timeout(&self) -> bool {
    matches!(self.kind, EnrichErrorKind::Timeout(_))
  }

  /// Fields the call failed to complete.
  pub fn missing(&self) -> Vec<Field> { self.partial.missing() }

  /// The API whose failure stopped the call, if one did.
  pub fn api(&self) -> Option<Api> {
    match &self.kind {
      EnrichErrorKind::Fetch(e) => Some(e.api()),
      EnrichErrorKind::Payload { field, .. } => Some(field.api()),
      EnrichErrorKind::Timeout(_) => None,
    }
  }

  pub fn rate_limit(&self) -> Option<RateLimit> {
    match &self.kind {
      EnrichErrorKind::Fetch(e) => e.rate_limit(),
      _ => None,
    }
  }
}

// ─── Enricher ────────────────────────────────────────────────────────────────

/// Holds one fetcher per field and the overall deadline.
#[derive(Debug, Clone)]
pub struct Enricher<F> {
  age:         F,
  gender:      F,
  nationality: F,
  timeout:     Duration,
}

impl<F: Fetcher> Enricher<F> {
  pub fn new(age: F, gender: F, nationality: F) -> Self {
    Self { age, gender, nationality, timeout: DEFAULT_TIMEOUT }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn timeout(&self) -> Duration { self.timeout }

  fn fetcher(&self, field: Field) -> &F {
    match field {
      Field::Age => &self.age,
      Field::Gender => &self.gender,
      Field::Nationality => &self.nationality,
    }
  }

  /// Look up all three fields for `name`.
  ///
  /// Returns a complete [`Enrichment`] or the first error. Errors reported
  /// after the first one are logged and otherwise ignored.
  pub async fn lookup(&self, name: &str) -> Result<Enrichment, EnrichError> {
    let cancel = CancellationToken::new();
    let deadline = Instant::now() + self.timeout;

    let mut tasks: FuturesUnordered<_> = Field::ALL
      .into_iter()
      .map(|field| {
        let cancel = &cancel;
        async move {
          let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = self.fetcher(field).fetch(name) => Some(
              res
                .map_err(EnrichErrorKind::from)
                .and_then(|payload| decode(field, &payload)),
            ),
          };
          (field, outcome)
        }
      })
      .collect();

    let mut collected = Enrichment::default();
    let mut failure: Option<EnrichErrorKind> = None;

    loop {
      match timeout_at(deadline, tasks.next()).await {
        Ok(None) => break,
        Ok(Some((field, None))) => {
          tracing::debug!(%field, "lookup cancelled");
        }
        Ok(Some((_, Some(Ok(value))))) => collected.merge(value),
        Ok(Some((field, Some(Err(kind))))) => {
          if failure.is_some() {
            tracing::debug!(%field, error = %kind, "ignoring later failure");
            continue;
          }
          tracing::warn!(%field, error = %kind, "lookup failed, cancelling siblings");
          cancel.cancel();
          failure = Some(kind);
        }
        Err(_) => {
          tracing::warn!(timeout = ?self.timeout, "enrichment deadline passed");
          cancel.cancel();
          failure.get_or_insert(EnrichErrorKind::Timeout(self.timeout));
          // Cancelled lookups resolve on their next poll.
          while tasks.next().await.is_some() {}
          break;
        }
      }
    }

    match failure {
      Some(kind) => Err(EnrichError {
        name: name.to_owned(),
        kind,
        partial: collected,
      }),
      None => Ok(collected),
    }
  }

  /// Enrich `person` by its first name. On failure `person` is unchanged.
  pub async fn enrich(&self, person: &mut Person) -> Result<(), EnrichError> {
    let enrichment = self.lookup(&person.name).await?;
    enrichment.apply(person);
    Ok(())
  }
}

/// Decode one lookup's payload, keeping only its own field.
fn decode(field: Field, payload: &[u8]) -> Result<Enrichment, EnrichErrorKind> {
  let decoded: Enrichment =
    serde_json::from_slice(payload).map_err(|e| EnrichErrorKind::Payload {
      field,
      reason: e.to_string(),
    })?;
  let own = decoded.only(field);
  if own.missing().contains(&field) {
    return Err(EnrichErrorKind::Payload {
      field,
      reason: format!("no {field} in payload"),
    });
  }
  Ok(own)
}
