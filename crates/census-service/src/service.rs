//! The [`People`] facade and its concrete [`PeopleService`].
//!
//! Enrichment never overlaps persistence: the store is touched on the create
//! path only after every field was inferred and the full record validated.
//! Reads go through the cache; writes invalidate it.

use std::{future::Future, time::Duration};

use bytes::Bytes;
use census_core::{
  broker::Producer,
  cache::Cache,
  person::{NewPerson, Person, PersonPatch},
  store::{PersonFilter, PersonStore},
  validate::{validate_candidate, validate_filter, validate_person},
};
use census_enrich::{Enricher, Fetcher};
use serde_json::json;
use uuid::Uuid;

use crate::{
  broker::Discard,
  error::{BuildError, Result, ServiceError},
};

/// How long a person stays cached when no TTL is configured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

fn cache_key(id: Uuid) -> String { id.hyphenated().to_string() }

// ─── Trait ───────────────────────────────────────────────────────────────────

/// The operations exposed to the HTTP and queue front ends.
pub trait People: Send + Sync {
  /// Validate, enrich, validate again and persist a new person.
  fn create(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person>> + Send + '_;

  fn get(&self, id: Uuid) -> impl Future<Output = Result<Person>> + Send + '_;

  fn list(
    &self,
    filter: PersonFilter,
  ) -> impl Future<Output = Result<Vec<Person>>> + Send + '_;

  fn update(
    &self,
    id: Uuid,
    patch: PersonPatch,
  ) -> impl Future<Output = Result<Person>> + Send + '_;

  fn delete(&self, id: Uuid) -> impl Future<Output = Result<()>> + Send + '_;
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct PeopleService<S, C, F, P = Discard> {
  store:     S,
  cache:     C,
  enricher:  Enricher<F>,
  events:    P,
  cache_ttl: Duration,
}

impl<S, C, F> PeopleService<S, C, F, Discard> {
  pub fn builder() -> ServiceBuilder<S, C, F, Discard> { ServiceBuilder::new() }
}

impl<S, C, F, P> PeopleService<S, C, F, P> {
  pub fn store(&self) -> &S { &self.store }

  pub fn cache(&self) -> &C { &self.cache }

  pub fn cache_ttl(&self) -> Duration { self.cache_ttl }
}

impl<S, C, F, P> PeopleService<S, C, F, P>
where
  C: Cache,
  P: Producer,
{
  async fn invalidate(&self, id: Uuid) -> Result<()> {
    self
      .cache
      .delete(&cache_key(id))
      .await
      .map_err(ServiceError::cache)
  }

  async fn emit_created(&self, person: &Person) {
    let event = json!({ "event": "person.created", "person": person });
    let message: Bytes = match serde_json::to_vec(&event) {
      Ok(bytes) => bytes.into(),
      Err(e) => {
        tracing::error!(error = %e, "could not encode created event");
        return;
      }
    };
    if let Err(e) = self.events.produce(message).await {
      tracing::warn!(id = ?person.id, error = %e, "created event not delivered");
    }
  }
}

impl<S, C, F, P> People for PeopleService<S, C, F, P>
where
  S: PersonStore,
  C: Cache,
  F: Fetcher,
  P: Producer,
{
  async fn create(&self, input: NewPerson) -> Result<Person> {
    validate_candidate(&input)?;

    let mut person = input.into_candidate();
    self.enricher.enrich(&mut person).await?;
    validate_person(&person)?;

    let person = self.store.create(person).await.map_err(ServiceError::store)?;
    tracing::info!(id = ?person.id, "person created");

    self.emit_created(&person).await;
    Ok(person)
  }

  async fn get(&self, id: Uuid) -> Result<Person> {
    let key = cache_key(id);

    match self.cache.get(&key).await {
      Ok(Some(bytes)) => match Person::from_slice(&bytes) {
        Ok(person) => {
          tracing::debug!(%id, "cache hit");
          return Ok(person);
        }
        Err(e) => tracing::warn!(%id, error = %e, "ignoring undecodable cache entry"),
      },
      Ok(None) => tracing::debug!(%id, "cache miss"),
      Err(e) => tracing::warn!(%id, error = %e, "cache read failed, using store"),
    }

    let person = self
      .store
      .get(id)
      .await
      .map_err(ServiceError::store)?
      .ok_or(ServiceError::NotFound(id))?;

    let bytes = person.to_bytes()?;
    if let Err(e) = self.cache.set(&key, bytes, self.cache_ttl).await {
      tracing::warn!(%id, error = %e, "cache write failed");
    }
    Ok(person)
  }

  async fn list(&self, filter: PersonFilter) -> Result<Vec<Person>> {
    validate_filter(&filter)?;
    self.store.list(&filter).await.map_err(ServiceError::store)
  }

  async fn update(&self, id: Uuid, patch: PersonPatch) -> Result<Person> {
    let mut person = self
      .store
      .get(id)
      .await
      .map_err(ServiceError::store)?
      .ok_or(ServiceError::NotFound(id))?;

    patch.apply(&mut person);
    validate_person(&person)?;

    let updated = self
      .store
      .update(person)
      .await
      .map_err(ServiceError::store)?
      .ok_or(ServiceError::NotFound(id))?;

    self.invalidate(id).await?;
    tracing::info!(%id, "person updated");
    Ok(updated)
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    if !self.store.delete(id).await.map_err(ServiceError::store)? {
      return Err(ServiceError::NotFound(id));
    }
    self.invalidate(id).await?;
    tracing::info!(%id, "person deleted");
    Ok(())
  }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Assembles a [`PeopleService`] from named dependencies.
///
/// `store`, `cache` and `enricher` are required. `events` defaults to
/// [`Discard`] and `cache_ttl` to [`DEFAULT_CACHE_TTL`].
pub struct ServiceBuilder<S, C, F, P = Discard> {
  store:     Option<S>,
  cache:     Option<C>,
  enricher:  Option<Enricher<F>>,
  events:    P,
  cache_ttl: Duration,
}

impl<S, C, F> ServiceBuilder<S, C, F, Discard> {
  pub fn new() -> Self {
    Self {
      store:     None,
      cache:     None,
      enricher:  None,
      events:    Discard,
      cache_ttl: DEFAULT_CACHE_TTL,
    }
  }
}

impl<S, C, F> Default for ServiceBuilder<S, C, F, Discard> {
  fn default() -> Self { Self::new() }
}

impl<S, C, F, P> ServiceBuilder<S, C, F, P> {
  pub fn store(mut self, store: S) -> Self {
    self.store = Some(store);
    self
  }

  pub fn cache(mut self, cache: C) -> Self {
    self.cache = Some(cache);
    self
  }

  pub fn enricher(mut self, enricher: Enricher<F>) -> Self {
    self.enricher = Some(enricher);
    self
  }

  pub fn cache_ttl(mut self, ttl: Duration) -> Self {
    self.cache_ttl = ttl;
    self
  }

  /// Publish `person.created` events to `events`.
  pub fn events<Q>(self, events: Q) -> ServiceBuilder<S, C, F, Q> {
    ServiceBuilder {
      store: self.store,
      cache: self.cache,
      enricher: self.enricher,
      events,
      cache_ttl: self.cache_ttl,
    }
  }

  pub fn build(self) -> Result<PeopleService<S, C, F, P>, BuildError> {
    Ok(PeopleService {
      store:     self.store.ok_or(BuildError::Missing("store"))?,
      cache:     self.cache.ok_or(BuildError::Missing("cache"))?,
      enricher:  self.enricher.ok_or(BuildError::Missing("enricher"))?,
      events:    self.events,
      cache_ttl: self.cache_ttl,
    })
  }
}
