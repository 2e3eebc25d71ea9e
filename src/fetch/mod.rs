//! Retrying HTTP fetcher shared by every pipeline stage.
//!
//! # Features
//!
//! - Bounded fixed-delay retries on connection failures and timeouts
//! - Disguised-failure detection (HTTP 200 carrying the service's error page)
//! - Structured error types with the failing URL attached
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::fetch::{HttpClient, HttpSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(&HttpSettings::default())?;
//! let page = client.fetch("https://parlinfo.aph.gov.au/parlInfo/feeds/rss.w3p").await?;
//! println!("{} bytes", page.body.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod retry;

pub use client::{FetchedPage, HttpClient, HttpSettings};
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_ERROR_PAGE_MARKER, READ_TIMEOUT_SECS};
pub use error::FetchError;
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, FailureType, RetryDecision, RetryPolicy,
    classify_error,
};
