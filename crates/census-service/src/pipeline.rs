//! The queue front end: turns inbound messages into created people.
//!
//! Each message is a JSON [`NewPerson`]. Messages that cannot be decoded or
//! fail validation are answered with an [`ErrorReport`] on the error
//! producer. Enrichment and storage failures are logged and the message is
//! dropped.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use census_core::{
  broker::{ConsumeError, Consumer, Producer},
  person::{NewPerson, Person},
  validate::ValidationErrors,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{error::ServiceError, service::People};

/// How long one poll of the consumer waits for a message.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Why a message was rejected back to its sender.
#[derive(Debug, Error)]
pub enum MessageError {
  #[error("malformed message: {0}")]
  Format(#[from] serde_json::Error),

  #[error(transparent)]
  Validation(#[from] ValidationErrors),
}

/// The body written to the error producer for a rejected message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
  /// The original message, as JSON when it parses, otherwise as a string.
  pub meta:  Value,
  pub error: String,
}

impl ErrorReport {
  pub fn new(message: &[u8], error: &MessageError) -> Self {
    let meta = serde_json::from_slice(message).unwrap_or_else(|_| {
      Value::String(String::from_utf8_lossy(message).into_owned())
    });
    Self { meta, error: error.to_string() }
  }

  pub fn to_bytes(&self) -> serde_json::Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(self)?))
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What happened to one poll of the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Nothing arrived within the poll window.
  Idle,
  /// The message was rejected and an error report sent.
  Reported,
  /// The message could not be processed and was discarded.
  Dropped,
  Saved(Person),
}

/// Running totals kept by [`Pipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
  pub saved:    usize,
  pub reported: usize,
  pub dropped:  usize,
}

impl Tally {
  fn record(&mut self, outcome: &Outcome) {
    match outcome {
      Outcome::Idle => {}
      Outcome::Reported => self.reported += 1,
      Outcome::Dropped => self.dropped += 1,
      Outcome::Saved(_) => self.saved += 1,
    }
  }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Reads messages one at a time and hands them to a [`People`] service.
pub struct Pipeline<Q, P, E> {
  input:        Q,
  people:       Arc<P>,
  errors:       E,
  poll_timeout: Duration,
}

impl<Q, P, E> Pipeline<Q, P, E>
where
  Q: Consumer,
  P: People,
  E: Producer,
{
  pub fn new(input: Q, people: Arc<P>, errors: E) -> Self {
    Self { input, people, errors, poll_timeout: DEFAULT_POLL_TIMEOUT }
  }

  pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
    self.poll_timeout = timeout;
    self
  }

  /// Poll once and process whatever arrived.
  ///
  /// A poll timeout is [`Outcome::Idle`]; a closed or broken input is an
  /// error.
  pub async fn step(&self) -> Result<Outcome, ConsumeError> {
    match self.input.consume(self.poll_timeout).await {
      Ok(message) => Ok(self.handle(&message).await),
      Err(e) if e.is_timeout() => Ok(Outcome::Idle),
      Err(e) => Err(e),
    }
  }

  /// Process a single message.
  pub async fn handle(&self, message: &[u8]) -> Outcome {
    let input: NewPerson = match serde_json::from_slice(message) {
      Ok(input) => input,
      Err(e) => return self.reject(message, e.into()).await,
    };

    match self.people.create(input).await {
      Ok(person) => Outcome::Saved(person),
      Err(ServiceError::Invalid(errors)) => {
        self.reject(message, errors.into()).await
      }
      Err(e) => {
        tracing::warn!(error = %e, "dropping message");
        Outcome::Dropped
      }
    }
  }

  async fn reject(&self, message: &[u8], error: MessageError) -> Outcome {
    tracing::info!(error = %error, "rejecting message");
    let report = ErrorReport::new(message, &error);

    let sent = match report.to_bytes() {
      Ok(bytes) => self.errors.produce(bytes).await.map_err(|e| e.to_string()),
      Err(e) => Err(e.to_string()),
    };
    match sent {
      Ok(()) => Outcome::Reported,
      Err(e) => {
        tracing::error!(error = %e, "error report not delivered");
        Outcome::Dropped
      }
    }
  }

  /// Process messages until the input closes or `shutdown` fires.
  ///
  /// A message being processed when `shutdown` fires is finished first.
  pub async fn run(&self, shutdown: CancellationToken) -> Result<Tally, ConsumeError> {
    let mut tally = Tally::default();
    loop {
      let polled = tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
          tracing::info!(?tally, "pipeline stopping");
          return Ok(tally);
        }
        polled = self.input.consume(self.poll_timeout) => polled,
      };

      let outcome = match polled {
        Ok(message) => self.handle(&message).await,
        Err(e) if e.is_timeout() => continue,
        Err(ConsumeError::Closed) => {
          tracing::info!(?tally, "input closed");
          return Ok(tally);
        }
        Err(e) => return Err(e),
      };
      tracing::debug!(?outcome, "message processed");
      tally.record(&outcome);
    }
  }
}
