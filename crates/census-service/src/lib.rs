//! The census service layer: the [`PeopleService`] facade, its in-memory
//! cache, line-delimited queue adapters and the queue [`Pipeline`].

#![allow(async_fn_in_trait)]

pub mod broker;
pub mod cache;
pub mod error;
pub mod pipeline;
pub mod service;

pub use error::{BuildError, Result, ServiceError};
pub use pipeline::{ErrorReport, MessageError, Outcome, Pipeline};
pub use service::{People, PeopleService, ServiceBuilder};
