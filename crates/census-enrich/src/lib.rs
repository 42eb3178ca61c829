//! Enrichment of a person's name with age, gender and nationality.
//!
//! Three [`Fetcher`]s query agify, genderize and nationalize. The
//! [`Enricher`] runs them concurrently for one name, cancels the rest on the
//! first failure and enforces an overall deadline.

#![allow(async_fn_in_trait)]

pub mod coordinator;
pub mod fetcher;
pub mod stub;

pub use coordinator::{
  DEFAULT_TIMEOUT, EnrichError, EnrichErrorKind, Enricher, Enrichment, Field,
};
pub use fetcher::{Api, ApiFetcher, FetchError, Fetcher, RateLimit};
