//! Hansard harvester core library
//!
//! Incrementally mirrors the XML transcripts published through the ParlInfo
//! search service. A crawl runs three stages, strictly in sequence:
//!
//! 1. [`query`] walks each named query's RSS feed and records every result page
//!    not seen before, stopping early once a page brings nothing new.
//! 2. [`resolver`] collapses the result pages to one landing page per sitting and
//!    maps each landing page to its XML and PDF assets, at most once.
//! 3. [`document`] stores every XML asset under a content-addressed directory,
//!    skipping documents already on disk.
//!
//! All progress is kept in JSON files under a data directory (see [`state`]), so
//! a crawl can be interrupted at any point and simply run again.
//!
//! # Architecture
//!
//! - [`fetch`] - HTTP client with bounded retries and error-page detection
//! - [`service`] - ParlInfo endpoints and the built-in query set
//! - [`pipeline`] - the [`Harvester`] that chains the stages
//! - [`hansard`] - session header summary of stored transcripts
//! - [`setdiff`] - line-set difference helper

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod document;
pub mod fetch;
pub mod hansard;
pub mod pipeline;
pub mod query;
pub mod resolver;
pub mod service;
pub mod setdiff;
pub mod state;
mod user_agent;

// Re-export commonly used types
pub use document::{DocumentError, DocumentFetcher, FetchOutcome, FetchSummary, Manifest};
pub use fetch::{FetchError, HttpClient, HttpSettings, RetryPolicy};
pub use hansard::{HeaderError, SessionHeader};
pub use pipeline::{CrawlOptions, DataLayout, HarvestError, HarvestSummary, Harvester};
pub use query::{
    PaginationMode, PaginationOutcome, QueryError, QueryPaginator, QueryState, StopReason,
};
pub use resolver::{ResolutionRecord, ResolutionState, ResolveError, ResolveSummary, Resolver};
pub use service::{QuerySpec, ServiceConfig};
pub use setdiff::line_set_diff;
pub use state::{FlushGuard, Persist, StateError};
