//! HTTP client wrapper with bounded retries and error-page detection.
//!
//! `HttpClient` issues one GET at a time. Connection failures and timeouts are
//! retried per the configured [`RetryPolicy`]; every completed response is then
//! checked for validity: a non-success status or a body carrying the service's
//! error-page marker is a hard failure that is never retried.

use std::borrow::Cow;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_ERROR_PAGE_MARKER, READ_TIMEOUT_SECS};
use super::error::FetchError;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use crate::user_agent;

/// Construction settings for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
    /// Retry policy for transient failures.
    pub retry_policy: RetryPolicy,
    /// Body substring identifying an error page served with HTTP 200.
    pub error_page_marker: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            retry_policy: RetryPolicy::default(),
            error_page_marker: DEFAULT_ERROR_PAGE_MARKER.to_string(),
        }
    }
}

/// A fully received response.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Returns the body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// HTTP client shared by every pipeline stage.
///
/// Created once per run and reused so connections are pooled.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry_policy: RetryPolicy,
    error_page_marker: String,
}

impl HttpClient {
    /// Creates a client from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the underlying client cannot be built.
    #[instrument(level = "debug", skip(settings))]
    pub fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| FetchError::ClientBuild { source })?;

        debug!(
            connect_timeout_secs = settings.connect_timeout_secs,
            read_timeout_secs = settings.read_timeout_secs,
            max_attempts = settings.retry_policy.max_attempts(),
            "creating HTTP client"
        );

        Ok(Self {
            client,
            retry_policy: settings.retry_policy.clone(),
            error_page_marker: settings.error_page_marker.clone(),
        })
    }

    /// Fetches `url` and validates the response.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the URL is invalid, transport failures outlast
    /// the retry budget, the server answers with a non-success status, or the
    /// body is the service's error page.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let page = self.get(url).await?;
        self.ensure_valid(&page)?;
        Ok(page)
    }

    /// Fetches `url` with retries on transient failure, without validating the response.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for invalid URLs and for transport failures.
    pub async fn get(&self, url: &str) -> Result<FetchedPage, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let mut attempt = 1;
        loop {
            let error = match self.get_once(url).await {
                Ok(page) => return Ok(page),
                Err(error) => error,
            };

            match self.retry_policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        %error,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(attempt, reason = %reason, "not retrying");
                    if classify_error(&error) == FailureType::Transient {
                        return Err(FetchError::retries_exhausted(url, attempt, error));
                    }
                    return Err(error);
                }
            }
        }
    }

    /// Checks a received page for hard and disguised failures.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::HttpStatus`] for non-success statuses and
    /// [`FetchError::DisguisedFailure`] when the body contains the error-page marker.
    pub fn ensure_valid(&self, page: &FetchedPage) -> Result<(), FetchError> {
        if !(200..300).contains(&page.status) {
            return Err(FetchError::http_status(&page.url, page.status));
        }
        if contains_marker(&page.body, self.error_page_marker.as_bytes()) {
            return Err(FetchError::disguised_failure(
                &page.url,
                &self.error_page_marker,
            ));
        }
        Ok(())
    }

    async fn get_once(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_transport(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_body_read(url, e))?;

        debug!(status, bytes = body.len(), "response received");
        Ok(FetchedPage {
            url: url.to_string(),
            status,
            body: body.to_vec(),
        })
    }
}

fn contains_marker(body: &[u8], marker: &[u8]) -> bool {
    !marker.is_empty() && body.windows(marker.len()).any(|window| window == marker)
}
