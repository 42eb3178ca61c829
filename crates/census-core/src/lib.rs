//! Core types and capability traits for the census person store.
//!
//! This crate is deliberately free of HTTP, database and runtime
//! dependencies. Every other crate depends on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod broker;
pub mod cache;
pub mod error;
pub mod person;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
