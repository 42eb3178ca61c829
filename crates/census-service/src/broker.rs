//! Line-delimited queue adapters.
//!
//! One message per line over any async byte stream: stdin, a file, a pipe
//! or a socket. Messages must not contain newlines; compact JSON never does.

use std::{convert::Infallible, io, time::Duration};

use bytes::Bytes;
use census_core::broker::{ConsumeError, Consumer, Producer};
use tokio::{
  io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _, Lines},
  sync::Mutex,
};

// ─── Consumer ────────────────────────────────────────────────────────────────

/// Reads one message per line. Blank lines are skipped.
pub struct LineConsumer<R> {
  lines: Mutex<Lines<R>>,
}

impl<R: AsyncBufRead + Unpin> LineConsumer<R> {
  pub fn new(reader: R) -> Self { Self { lines: Mutex::new(reader.lines()) } }
}

impl<R> Consumer for LineConsumer<R>
where
  R: AsyncBufRead + Unpin + Send,
{
  async fn consume(&self, timeout: Duration) -> Result<Bytes, ConsumeError> {
    let mut lines = self.lines.lock().await;
    loop {
      // `next_line` is cancel-safe, so a timeout never loses a partial line.
      match tokio::time::timeout(timeout, lines.next_line()).await {
        Err(_) => return Err(ConsumeError::Timeout(timeout)),
        Ok(Err(e)) => return Err(ConsumeError::Io(Box::new(e))),
        Ok(Ok(None)) => return Err(ConsumeError::Closed),
        Ok(Ok(Some(line))) if line.trim().is_empty() => continue,
        Ok(Ok(Some(line))) => return Ok(Bytes::from(line)),
      }
    }
  }
}

// ─── Producers ───────────────────────────────────────────────────────────────

/// Writes one message per line and flushes after each.
pub struct LineProducer<W> {
  writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin> LineProducer<W> {
  pub fn new(writer: W) -> Self { Self { writer: Mutex::new(writer) } }
}

impl<W> Producer for LineProducer<W>
where
  W: AsyncWrite + Unpin + Send,
{
  type Error = io::Error;

  async fn produce(&self, message: Bytes) -> io::Result<()> {
    let mut writer = self.writer.lock().await;
    writer.write_all(&message).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
  }
}

/// Drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Producer for Discard {
  type Error = Infallible;

  async fn produce(&self, message: Bytes) -> Result<(), Infallible> {
    tracing::trace!(bytes = message.len(), "message discarded");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use tokio::io::{AsyncReadExt as _, BufReader, duplex};

  use super::*;

  #[tokio::test]
  async fn consumer_skips_blank_lines_and_reports_close() {
    let input: &[u8] = b"{\"name\":\"Ivan\"}\n\n   \n{\"name\":\"Anna\"}\n";
    let consumer = LineConsumer::new(BufReader::new(input));
    let timeout = Duration::from_secs(1);

    assert_eq!(consumer.consume(timeout).await.unwrap(), "{\"name\":\"Ivan\"}");
    assert_eq!(consumer.consume(timeout).await.unwrap(), "{\"name\":\"Anna\"}");
    assert!(matches!(consumer.consume(timeout).await, Err(ConsumeError::Closed)));
  }

  #[tokio::test]
  async fn consumer_times_out_without_losing_input() {
    let (mut tx, rx) = duplex(64);
    let consumer = LineConsumer::new(BufReader::new(rx));

    tx.write_all(b"{\"name\":").await.unwrap();
    let err = consumer.consume(Duration::from_millis(20)).await.unwrap_err();
    assert!(err.is_timeout());

    tx.write_all(b"\"Ivan\"}\n").await.unwrap();
    let message = consumer.consume(Duration::from_secs(1)).await.unwrap();
    assert_eq!(message, "{\"name\":\"Ivan\"}");
  }

  #[tokio::test]
  async fn producer_writes_one_line_per_message() {
    let (tx, mut rx) = duplex(256);
    let producer = LineProducer::new(tx);

    producer.produce(Bytes::from_static(b"{\"a\":1}")).await.unwrap();
    producer.produce(Bytes::from_static(b"{\"b\":2}")).await.unwrap();
    drop(producer);

    let mut out = String::new();
    rx.read_to_string(&mut out).await.unwrap();
    assert_eq!(out, "{\"a\":1}\n{\"b\":2}\n");
  }
}
