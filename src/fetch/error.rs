//! Error types for the fetch module.
//!
//! Every variant carries the URL that failed so a fatal error surfacing from a
//! pipeline stage points straight at the offending request.

use thiserror::Error;

/// Errors that can occur while fetching a page or asset.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection could not be established (DNS, refused, reset during connect).
    #[error("connection failed for {url}: {source}")]
    Connect {
        /// The URL being fetched.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before a response was received.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Any other transport error (body decoding, protocol errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL being fetched.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The connection failed while the response body was being read.
    #[error("connection lost reading body of {url}: {source}")]
    Body {
        /// The URL being fetched.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Transient failures persisted through every allowed attempt.
    #[error("giving up on {url} after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// The URL being fetched.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The last failure observed.
        #[source]
        source: Box<FetchError>,
    },

    /// HTTP error response (4xx, 5xx).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// HTTP 200 whose body is the service's error page.
    #[error("server returned an error page for {url} (found marker {marker:?})")]
    DisguisedFailure {
        /// The URL whose response was an error page.
        url: String,
        /// The marker that identified the error page.
        marker: String,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Maps a transport error from `reqwest` onto the matching variant.
    pub fn from_transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else if source.is_connect() {
            Self::Connect { url, source }
        } else {
            Self::Network { url, source }
        }
    }

    /// Maps a failure while reading a response body; the status line was received.
    pub fn from_body_read(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Body { url, source }
        }
    }

    /// Wraps the last transient failure once the retry budget is spent.
    pub fn retries_exhausted(url: impl Into<String>, attempts: u32, last: FetchError) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            attempts,
            source: Box::new(last),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a disguised-failure error.
    pub fn disguised_failure(url: impl Into<String>, marker: impl Into<String>) -> Self {
        Self::DisguisedFailure {
            url: url.into(),
            marker: marker.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns the URL the error relates to, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Connect { url, .. }
            | Self::Timeout { url }
            | Self::Network { url, .. }
            | Self::Body { url, .. }
            | Self::RetriesExhausted { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::DisguisedFailure { url, .. }
            | Self::InvalidUrl { url } => Some(url),
            Self::ClientBuild { .. } => None,
        }
    }
}
