//! Landing-page resolution: check URI to XML/PDF asset links.
//!
//! Each logical document's landing page is fetched at most once. The outcome,
//! including "no XML available", is kept in a single [`ResolutionState`] shared
//! by all queries. A URI already present is skipped unless it has no XML asset
//! and the caller asked to retry unresolved entries.

mod links;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use crate::fetch::{FetchError, HttpClient};
use crate::state::{FlushGuard, Persist, StateError, load_map, save_map};

pub use links::{
    AssetLinks, PDF_ASSET_MARKER, XML_ASSET_MARKER, absolutize_url, extract_links, select_assets,
};

/// Errors that abort a resolution pass.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Fetching a landing page failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Persisting the resolution state failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// The configured origin is not a valid base URL.
    #[error("invalid service origin: {origin}")]
    InvalidOrigin {
        /// The rejected origin.
        origin: String,
    },
}

/// Assets found on a landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    /// The landing-page URI that was checked.
    pub uri: String,
    /// The XML asset, or `None` when the page offers no XML.
    pub xml_uri: Option<String>,
    /// The PDF asset, if any.
    pub pdf_uri: Option<String>,
}

/// Landing-page URI to resolution record; `None` marks a page with no assets.
#[derive(Debug)]
pub struct ResolutionState {
    path: PathBuf,
    entries: BTreeMap<String, Option<ResolutionRecord>>,
}

impl ResolutionState {
    /// File name of the resolution state under the data directory.
    pub const FILE_NAME: &'static str = "resolved.json";

    /// Loads the state at `path`, or starts empty if absent or corrupt.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_map(&path);
        Self { path, entries }
    }

    /// Returns the state file location under `data_dir`.
    #[must_use]
    pub fn path_for(data_dir: &Path) -> PathBuf {
        data_dir.join(Self::FILE_NAME)
    }

    /// Returns `true` if `uri` has to be (re)checked.
    #[must_use]
    pub fn needs_check(&self, uri: &str, retry_unresolved: bool) -> bool {
        match self.entries.get(uri) {
            None => true,
            Some(Some(record)) if record.xml_uri.is_some() => false,
            Some(_) => retry_unresolved,
        }
    }

    /// Stores the outcome for `uri`, replacing any previous outcome.
    pub fn record(&mut self, uri: impl Into<String>, record: Option<ResolutionRecord>) {
        self.entries.insert(uri.into(), record);
    }

    /// Returns the stored outcome for `uri`; `Some(None)` means checked without assets.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<Option<&ResolutionRecord>> {
        self.entries.get(uri).map(Option::as_ref)
    }

    /// Returns every record with an XML asset, in URI order.
    #[must_use]
    pub fn xml_records(&self) -> Vec<ResolutionRecord> {
        self.entries
            .values()
            .flatten()
            .filter(|record| record.xml_uri.is_some())
            .cloned()
            .collect()
    }

    /// Returns the number of checked landing pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been checked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Persist for ResolutionState {
    fn flush(&mut self) -> Result<(), StateError> {
        save_map(&self.path, &self.entries)
    }
}

/// Counters from one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    /// Landing pages fetched in this pass.
    pub checked: usize,
    /// Pages fetched that offered an XML asset.
    pub with_xml: usize,
    /// Pages fetched that offered no XML asset.
    pub without_xml: usize,
    /// Check URIs skipped because they were already resolved.
    pub skipped: usize,
}

/// Maps check URIs to their asset links.
#[derive(Debug, Clone)]
pub struct Resolver {
    origin: Url,
}

impl Resolver {
    /// Creates a resolver that resolves relative links against `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidOrigin`] if `origin` is not an absolute URL.
    pub fn new(origin: &str) -> Result<Self, ResolveError> {
        let origin = Url::parse(origin).map_err(|_| ResolveError::InvalidOrigin {
            origin: origin.to_string(),
        })?;
        Ok(Self { origin })
    }

    /// Resolves every URI in `uris` that still needs a check.
    ///
    /// The state is saved when the pass ends, whether it succeeded or not, so
    /// pages resolved before a failure are not fetched again.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Fetch`] on the first landing page that cannot be
    /// fetched or is an error page, and [`ResolveError::State`] if saving fails.
    #[instrument(skip_all, fields(candidates = uris.len(), retry_unresolved = retry_unresolved))]
    pub async fn resolve_all(
        &self,
        client: &HttpClient,
        state: &mut ResolutionState,
        uris: &BTreeSet<String>,
        retry_unresolved: bool,
    ) -> Result<ResolveSummary, ResolveError> {
        let mut state = FlushGuard::new(state);
        let outcome = self
            .resolve_pending(client, &mut state, uris, retry_unresolved)
            .await;
        match outcome {
            Ok(summary) => {
                state.release()?;
                Ok(summary)
            }
            Err(error) => Err(error),
        }
    }

    async fn resolve_pending(
        &self,
        client: &HttpClient,
        state: &mut ResolutionState,
        uris: &BTreeSet<String>,
        retry_unresolved: bool,
    ) -> Result<ResolveSummary, ResolveError> {
        let mut summary = ResolveSummary::default();
        for uri in uris {
            if !state.needs_check(uri, retry_unresolved) {
                summary.skipped += 1;
                continue;
            }

            let record = self.resolve_one(client, uri).await?;
            match record.as_ref().and_then(|r| r.xml_uri.as_deref()) {
                Some(xml_uri) => {
                    info!(uri = %uri, xml_uri = %xml_uri, "resolved landing page");
                    summary.with_xml += 1;
                }
                None => {
                    info!(uri = %uri, "landing page has no XML asset");
                    summary.without_xml += 1;
                }
            }
            summary.checked += 1;
            state.record(uri.as_str(), record);
        }
        debug!(?summary, "resolution pass finished");
        Ok(summary)
    }

    /// Fetches one landing page and extracts its assets.
    ///
    /// Returns `None` when the page links to neither an XML nor a PDF asset.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Fetch`] if the page cannot be fetched or is an error page.
    pub async fn resolve_one(
        &self,
        client: &HttpClient,
        uri: &str,
    ) -> Result<Option<ResolutionRecord>, ResolveError> {
        let page = client.fetch(uri).await?;
        let assets = select_assets(&extract_links(&page.text(), &self.origin));
        if assets.xml_uri.is_none() && assets.pdf_uri.is_none() {
            return Ok(None);
        }
        Ok(Some(ResolutionRecord {
            uri: uri.to_string(),
            xml_uri: assets.xml_uri,
            pdf_uri: assets.pdf_uri,
        }))
    }
}
