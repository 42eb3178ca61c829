//! `census`: the person enrichment service.
//!
//! `census serve` answers the JSON API over HTTP; `census worker` reads
//! one JSON person per line from stdin (or `--input`) and writes error
//! reports as JSON lines. Both read `census.toml` (or `--config`) and
//! `CENSUS__*` environment variables.

mod http;
mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use census_enrich::{Api, ApiFetcher, Enricher};
use census_service::{
  PeopleService, Pipeline,
  broker::{LineConsumer, LineProducer},
  cache::MemoryCache,
};
use census_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::{
  io::{AsyncRead, AsyncWrite, BufReader},
  net::TcpListener,
};
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{ServerConfig, expand_tilde};

type Sink = Box<dyn AsyncWrite + Send + Unpin>;
type Service = PeopleService<SqliteStore, MemoryCache, ApiFetcher, LineProducer<Sink>>;

#[derive(Parser)]
#[command(author, version, about = "Person enrichment service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "census.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Create people from JSON lines until the input ends.
  Worker {
    /// Read messages from this file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr; stdout may carry error reports.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = settings::load(&cli.config).context("failed to load configuration")?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(cfg).await,
    Command::Worker { input } => worker(cfg, input).await,
  }
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  let people = build_service(&cfg).await?;

  let app = http::layered(census_api::api_router(people), cfg.request_timeout());

  let address = cfg.address();
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!("Listening on http://{address}");

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutting down");
      }
    })
    .await
    .context("server error")?;

  Ok(())
}

async fn worker(cfg: ServerConfig, input: Option<PathBuf>) -> anyhow::Result<()> {
  let people = build_service(&cfg).await?;

  let reader: Box<dyn AsyncRead + Send + Unpin> = match &input {
    Some(path) => Box::new(
      tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {path:?}"))?,
    ),
    None => Box::new(tokio::io::stdin()),
  };
  let errors = open_sink(cfg.queue.errors_path.as_deref(), Box::new(tokio::io::stdout())).await?;

  let pipeline = Pipeline::new(
    LineConsumer::new(BufReader::new(reader)),
    people,
    LineProducer::new(errors),
  )
  .with_poll_timeout(cfg.queue.poll_timeout());

  let shutdown = CancellationToken::new();
  let trigger = shutdown.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      trigger.cancel();
    }
  });

  let tally = pipeline.run(shutdown).await.context("queue input failed")?;
  tracing::info!(
    saved = tally.saved,
    reported = tally.reported,
    dropped = tally.dropped,
    "worker finished"
  );
  Ok(())
}

async fn build_service(cfg: &ServerConfig) -> anyhow::Result<Arc<Service>> {
  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let client = reqwest::Client::builder()
    .timeout(cfg.enrichment.http_timeout())
    .build()
    .context("failed to build HTTP client")?;
  let fetcher = |api: Api| ApiFetcher::new(api, cfg.enrichment.url(api), client.clone());
  let enricher = Enricher::new(
    fetcher(Api::Age),
    fetcher(Api::Gender),
    fetcher(Api::Nationality),
  )
  .with_timeout(cfg.enrichment.timeout());

  let events = open_sink(cfg.queue.events_path.as_deref(), Box::new(tokio::io::sink())).await?;

  let service = PeopleService::builder()
    .store(store)
    .cache(MemoryCache::new(cfg.cache.capacity))
    .enricher(enricher)
    .events(LineProducer::new(events))
    .cache_ttl(cfg.cache.ttl())
    .build()?;

  Ok(Arc::new(service))
}

/// Append to `path` when given, otherwise write to `fallback`.
async fn open_sink(path: Option<&Path>, fallback: Sink) -> anyhow::Result<Sink> {
  let Some(path) = path else {
    return Ok(fallback);
  };
  let file = tokio::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .await
    .with_context(|| format!("failed to open {path:?}"))?;
  Ok(Box::new(file))
}
