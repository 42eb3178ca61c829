//! One HTTP lookup per inference API.
//!
//! Each fetcher asks its API about a single first name and normalises the
//! answer into a small JSON object keyed by the canonical person field:
//!
//! ```json
//! {"age": 42, "count": 1200, "name": "ivan"}
//! {"gender": "male", "probability": 0.99, "count": 800, "name": "ivan"}
//! {"nationality": "RU", "probability": 0.71, "count": 900, "name": "ivan"}
//! ```

use std::{fmt, future::Future};

use bytes::Bytes;
use reqwest::{Client, header::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

pub const AGIFY_URL: &str = "https://api.agify.io";
pub const GENDERIZE_URL: &str = "https://api.genderize.io";
pub const NATIONALIZE_URL: &str = "https://api.nationalize.io";

const LIMIT_HEADER: &str = "x-rate-limit-limit";
const REMAINING_HEADER: &str = "x-rate-limit-remaining";
const RESET_HEADER: &str = "x-rate-limit-reset";

// ─── Api ─────────────────────────────────────────────────────────────────────

/// The upstream service a fetcher talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Api {
  #[serde(rename = "agify")]
  Age,
  #[serde(rename = "genderize")]
  Gender,
  #[serde(rename = "nationalize")]
  Nationality,
}

impl Api {
  /// Service name, as it appears in logs and error bodies.
  pub fn name(self) -> &'static str {
    match self {
      Self::Age => "agify",
      Self::Gender => "genderize",
      Self::Nationality => "nationalize",
    }
  }

  /// The person field this service infers.
  pub fn field(self) -> &'static str {
    match self {
      Self::Age => "age",
      Self::Gender => "gender",
      Self::Nationality => "nationality",
    }
  }

  pub fn default_url(self) -> &'static str {
    match self {
      Self::Age => AGIFY_URL,
      Self::Gender => GENDERIZE_URL,
      Self::Nationality => NATIONALIZE_URL,
    }
  }
}

impl fmt::Display for Api {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

// ─── Rate limit ──────────────────────────────────────────────────────────────

/// Quota information reported by the upstream on every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimit {
  /// Names allotted for the current window.
  pub limit:     i64,
  /// Names left in the current window.
  pub remaining: i64,
  /// Seconds until the window resets.
  pub reset:     i64,
}

impl RateLimit {
  /// Parse the `X-Rate-Limit-*` headers. All three must be present and
  /// numeric.
  pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
    let read = |name: &str| -> Option<i64> {
      headers.get(name)?.to_str().ok()?.trim().parse().ok()
    };
    Some(Self {
      limit:     read(LIMIT_HEADER)?,
      remaining: read(REMAINING_HEADER)?,
      reset:     read(RESET_HEADER)?,
    })
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("{api}: the name is empty")]
  EmptyName { api: Api },

  #[error("{api}: request failed: {cause}")]
  Transport {
    api:   Api,
    #[source]
    cause: reqwest::Error,
  },

  #[error("{api}: upstream answered {status}: {message}")]
  Status {
    api:        Api,
    status:     u16,
    message:    String,
    rate_limit: Option<RateLimit>,
  },

  #[error("{api}: malformed response: {cause}")]
  Decode {
    api:   Api,
    #[source]
    cause: serde_json::Error,
  },

  #[error("{api}: no {} known for {name:?}", .api.field())]
  NoData { api: Api, name: String },
}

impl FetchError {
  pub fn api(&self) -> Api {
    match self {
      Self::EmptyName { api }
      | Self::Transport { api, .. }
      | Self::Status { api, .. }
      | Self::Decode { api, .. }
      | Self::NoData { api, .. } => *api,
    }
  }

  pub fn rate_limit(&self) -> Option<RateLimit> {
    match self {
      Self::Status { rate_limit, .. } => *rate_limit,
      _ => None,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A single-name lookup against one inference API.
///
/// Implementations must not retry; the caller owns the retry policy and the
/// deadline. Dropping the returned future abandons the request.
pub trait Fetcher: Send + Sync {
  fn api(&self) -> Api;

  /// Look up `name` and return the normalised JSON payload.
  fn fetch<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Bytes, FetchError>> + Send + 'a;
}

// ─── HTTP implementation ─────────────────────────────────────────────────────

/// A [`Fetcher`] issuing `GET {endpoint}?name={name}`.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct ApiFetcher {
  api:      Api,
  endpoint: String,
  client:   Client,
}

impl ApiFetcher {
  pub fn new(api: Api, endpoint: impl Into<String>, client: Client) -> Self {
    Self { api, endpoint: endpoint.into(), client }
  }

  /// A fetcher for the public endpoint of `api`.
  pub fn public(api: Api, client: Client) -> Self {
    Self::new(api, api.default_url(), client)
  }

  pub fn endpoint(&self) -> &str { &self.endpoint }
}

#[derive(Deserialize)]
struct UpstreamError {
  error: String,
}

impl Fetcher for ApiFetcher {
  fn api(&self) -> Api { self.api }

  async fn fetch(&self, name: &str) -> Result<Bytes, FetchError> {
    let api = self.api;
    if name.is_empty() {
      return Err(FetchError::EmptyName { api });
    }

    let resp = self
      .client
      .get(&self.endpoint)
      .query(&[("name", name)])
      .send()
      .await
      .map_err(|cause| FetchError::Transport { api, cause })?;

    let status = resp.status();
    let rate_limit = RateLimit::from_headers(resp.headers());
    let body = resp
      .bytes()
      .await
      .map_err(|cause| FetchError::Transport { api, cause })?;

    if !status.is_success() {
      let message = serde_json::from_slice::<UpstreamError>(&body)
        .map(|e| e.error)
        .unwrap_or_else(|_| {
          status.canonical_reason().unwrap_or("request failed").to_owned()
        });
      tracing::warn!(
        %api,
        status = status.as_u16(),
        remaining = rate_limit.map(|r| r.remaining),
        "upstream rejected lookup"
      );
      return Err(FetchError::Status {
        api,
        status: status.as_u16(),
        message,
        rate_limit,
      });
    }

    tracing::debug!(%api, remaining = rate_limit.map(|r| r.remaining), "lookup ok");
    normalise(api, name, &body)
  }
}

// ─── Normalisation ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AgifyBody {
  #[serde(default)]
  count: Option<u64>,
  #[serde(default)]
  name:  Option<String>,
  age:   Option<i32>,
}

#[derive(Deserialize)]
struct GenderizeBody {
  #[serde(default)]
  count:       Option<u64>,
  #[serde(default)]
  name:        Option<String>,
  gender:      Option<String>,
  #[serde(default)]
  probability: Option<f64>,
}

#[derive(Deserialize)]
struct NationalizeBody {
  #[serde(default)]
  count:   Option<u64>,
  #[serde(default)]
  name:    Option<String>,
  #[serde(default)]
  country: Vec<Country>,
}

#[derive(Deserialize)]
struct Country {
  country_id:  String,
  probability: f64,
}

/// Turn a raw upstream body into the canonical payload for `api`.
pub fn normalise(api: Api, name: &str, body: &[u8]) -> Result<Bytes, FetchError> {
  let decode = |cause| FetchError::Decode { api, cause };
  let no_data = || FetchError::NoData { api, name: name.to_owned() };

  let value = match api {
    Api::Age => {
      let body: AgifyBody = serde_json::from_slice(body).map_err(decode)?;
      let age = body.age.ok_or_else(no_data)?;
      json!({
        "age": age,
        "count": body.count,
        "name": body.name.unwrap_or_else(|| name.to_owned()),
      })
    }
    Api::Gender => {
      let body: GenderizeBody = serde_json::from_slice(body).map_err(decode)?;
      let gender = body.gender.ok_or_else(no_data)?;
      json!({
        "gender": gender,
        "probability": body.probability,
        "count": body.count,
        "name": body.name.unwrap_or_else(|| name.to_owned()),
      })
    }
    Api::Nationality => {
      let body: NationalizeBody =
        serde_json::from_slice(body).map_err(decode)?;
      let best = body
        .country
        .into_iter()
        .max_by(|a, b| a.probability.total_cmp(&b.probability))
        .ok_or_else(no_data)?;
      json!({
        "nationality": best.country_id,
        "probability": best.probability,
        "count": body.count,
        "name": body.name.unwrap_or_else(|| name.to_owned()),
      })
    }
  };

  Ok(Bytes::from(value.to_string()))
}
