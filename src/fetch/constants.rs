//! Constants for the fetch module (timeouts, error-page detection).

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout (2 minutes; some Hansard XML files are large).
pub const READ_TIMEOUT_SECS: u64 = 120;

/// Title text of the page ParlInfo serves with HTTP 200 when a request fails.
pub const DEFAULT_ERROR_PAGE_MARKER: &str = "ParlInfo - Error";
