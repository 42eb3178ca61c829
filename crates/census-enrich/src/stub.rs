//! A [`Fetcher`] that answers from a fixed script instead of the network.

use std::{
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use bytes::Bytes;
use serde_json::Value;

use crate::fetcher::{Api, FetchError, Fetcher, RateLimit};

#[derive(Debug, Clone)]
enum Reply {
  Payload(Value),
  Status {
    status:     u16,
    message:    String,
    rate_limit: Option<RateLimit>,
  },
}

/// Shared call counters of a [`StaticFetcher`], readable after the fetcher
/// has been moved into an `Enricher`.
#[derive(Debug, Clone, Default)]
pub struct Calls {
  started:   Arc<AtomicUsize>,
  completed: Arc<AtomicUsize>,
}

impl Calls {
  /// Calls that got past the empty-name check.
  pub fn started(&self) -> usize { self.started.load(Ordering::SeqCst) }

  /// Calls that ran to the end of their delay and produced a reply.
  pub fn completed(&self) -> usize { self.completed.load(Ordering::SeqCst) }
}

#[derive(Debug, Clone)]
pub struct StaticFetcher {
  api:   Api,
  reply: Reply,
  delay: Option<Duration>,
  calls: Calls,
}

impl StaticFetcher {
  /// Reply with `payload`, which should already be in normalised form.
  pub fn ok(api: Api, payload: Value) -> Self {
    Self {
      api,
      reply: Reply::Payload(payload),
      delay: None,
      calls: Calls::default(),
    }
  }

  /// Fail as an upstream answering `status` would.
  pub fn failing(api: Api, status: u16, message: impl Into<String>) -> Self {
    Self {
      api,
      reply: Reply::Status {
        status,
        message: message.into(),
        rate_limit: None,
      },
      delay: None,
      calls: Calls::default(),
    }
  }

  /// Attach quota headers to a failing reply. No effect on payload replies.
  pub fn with_rate_limit(mut self, limit: RateLimit) -> Self {
    if let Reply::Status { rate_limit, .. } = &mut self.reply {
      *rate_limit = Some(limit);
    }
    self
  }

  /// Sleep for `delay` before replying.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn calls(&self) -> Calls { self.calls.clone() }
}

impl Fetcher for StaticFetcher {
  fn api(&self) -> Api { self.api }

  async fn fetch(&self, name: &str) -> Result<Bytes, FetchError> {
    let api = self.api;
    if name.is_empty() {
      return Err(FetchError::EmptyName { api });
    }

    self.calls.started.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    self.calls.completed.fetch_add(1, Ordering::SeqCst);

    match &self.reply {
      Reply::Payload(value) => Ok(Bytes::from(value.to_string())),
      Reply::Status { status, message, rate_limit } => Err(FetchError::Status {
        api,
        status: *status,
        message: message.clone(),
        rate_limit: *rate_limit,
      }),
    }
  }
}
