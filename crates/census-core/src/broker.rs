//! Message-queue boundary: a [`Consumer`] of raw input messages and a
//! [`Producer`] of raw output messages.
//!
//! Delivery guarantees belong to whatever sits behind these traits.

use std::{future::Future, time::Duration};

use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsumeError {
  /// Nothing arrived within the poll window. Not fatal; poll again.
  #[error("no message within {0:?}")]
  Timeout(Duration),

  /// The source is exhausted and will never yield another message.
  #[error("consumer closed")]
  Closed,

  #[error("consumer error: {0}")]
  Io(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ConsumeError {
  pub fn is_timeout(&self) -> bool { matches!(self, Self::Timeout(_)) }
}

pub trait Consumer: Send + Sync {
  /// Wait up to `timeout` for the next message.
  fn consume(
    &self,
    timeout: Duration,
  ) -> impl Future<Output = Result<Bytes, ConsumeError>> + Send + '_;
}

pub trait Producer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn produce(
    &self,
    message: Bytes,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
