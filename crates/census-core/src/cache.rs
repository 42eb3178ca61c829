//! The `Cache` trait: a key-value store with per-entry expiry.
//!
//! Wrapped around store reads by the service layer. Implementations are
//! expected to be internally synchronised.

use std::{future::Future, time::Duration};

use bytes::Bytes;

pub trait Cache: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up `key`. Expired entries are reported as absent.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Bytes>, Self::Error>> + Send + 'a;

  /// Store `value` under `key` for `ttl`, replacing any previous entry.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: Bytes,
    ttl: Duration,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove `key`. Removing an absent key is not an error.
  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
