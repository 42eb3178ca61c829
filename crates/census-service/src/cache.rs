//! [`MemoryCache`]: a bounded in-process [`Cache`] built on moka.

use std::{
  convert::Infallible,
  time::{Duration, Instant},
};

use bytes::Bytes;
use census_core::cache::Cache;
use moka::{Expiry, future::Cache as MokaCache};

/// Entries kept when no capacity is configured.
pub const DEFAULT_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone)]
struct Entry {
  value: Bytes,
  ttl:   Duration,
}

/// Each entry expires after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
  fn expire_after_create(
    &self,
    _key: &String,
    entry: &Entry,
    _created_at: Instant,
  ) -> Option<Duration> {
    Some(entry.ttl)
  }

  fn expire_after_update(
    &self,
    _key: &String,
    entry: &Entry,
    _updated_at: Instant,
    _remaining: Option<Duration>,
  ) -> Option<Duration> {
    Some(entry.ttl)
  }
}

/// Concurrent LRU-ish cache with per-entry expiry.
///
/// Cheap to clone; clones share the same storage.
#[derive(Clone)]
pub struct MemoryCache {
  inner: MokaCache<String, Entry>,
}

impl MemoryCache {
  pub fn new(max_capacity: u64) -> Self {
    Self {
      inner: MokaCache::builder()
        .max_capacity(max_capacity)
        .expire_after(PerEntryTtl)
        .build(),
    }
  }

  pub fn entry_count(&self) -> u64 { self.inner.entry_count() }
}

impl Default for MemoryCache {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

impl Cache for MemoryCache {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<Bytes>, Infallible> {
    Ok(self.inner.get(key).await.map(|entry| entry.value))
  }

  async fn set(
    &self,
    key: &str,
    value: Bytes,
    ttl: Duration,
  ) -> Result<(), Infallible> {
    self.inner.insert(key.to_owned(), Entry { value, ttl }).await;
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), Infallible> {
    self.inner.invalidate(key).await;
    Ok(())
  }
}
