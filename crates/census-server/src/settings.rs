//! Runtime configuration, read once at start-up.
//!
//! Sources, later ones winning: built-in defaults, the TOML file named by
//! `--config` (optional), then `CENSUS__*` environment variables with `__`
//! separating nested keys, e.g. `CENSUS__ENRICHMENT__TIMEOUT_MS=1500`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use census_enrich::Api;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub request_timeout_ms: u64,
  pub enrichment:         EnrichmentConfig,
  pub cache:              CacheConfig,
  pub queue:              QueueConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_owned(),
      port:               8080,
      store_path:         PathBuf::from("census.db"),
      request_timeout_ms: 10_000,
      enrichment:         EnrichmentConfig::default(),
      cache:              CacheConfig::default(),
      queue:              QueueConfig::default(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }
}

/// Endpoints and deadlines for the inference APIs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
  pub age_url:         String,
  pub gender_url:      String,
  pub nationality_url: String,
  /// Deadline for all three lookups together.
  pub timeout_ms:      u64,
  /// Per-request timeout of the HTTP client.
  pub http_timeout_ms: u64,
}

impl Default for EnrichmentConfig {
  fn default() -> Self {
    Self {
      age_url:         Api::Age.default_url().to_owned(),
      gender_url:      Api::Gender.default_url().to_owned(),
      nationality_url: Api::Nationality.default_url().to_owned(),
      timeout_ms:      2_000,
      http_timeout_ms: 5_000,
    }
  }
}

impl EnrichmentConfig {
  pub fn url(&self, api: Api) -> &str {
    match api {
      Api::Age => &self.age_url,
      Api::Gender => &self.gender_url,
      Api::Nationality => &self.nationality_url,
    }
  }

  pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }

  pub fn http_timeout(&self) -> Duration {
    Duration::from_millis(self.http_timeout_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub ttl_secs: u64,
  pub capacity: u64,
}

impl Default for CacheConfig {
  fn default() -> Self { Self { ttl_secs: 300, capacity: 10_000 } }
}

impl CacheConfig {
  pub fn ttl(&self) -> Duration { Duration::from_secs(self.ttl_secs) }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
  pub poll_timeout_ms: u64,
  /// Where error reports go. Standard output when unset.
  pub errors_path:     Option<PathBuf>,
  /// Where `person.created` events go. Discarded when unset.
  pub events_path:     Option<PathBuf>,
}

impl Default for QueueConfig {
  fn default() -> Self {
    Self { poll_timeout_ms: 100, errors_path: None, events_path: None }
  }
}

impl QueueConfig {
  pub fn poll_timeout(&self) -> Duration {
    Duration::from_millis(self.poll_timeout_ms)
  }
}

/// Layer the config file at `path` (if it exists) and the environment over
/// the defaults.
pub fn load(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("CENSUS")
        .separator("__")
        .try_parsing(true),
    )
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
