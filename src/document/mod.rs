//! Content-addressed storage of resolved XML documents.
//!
//! Each document lives in `<root>/<sha256 of XML URI>/` next to an `info.json`
//! manifest carrying its resolution record. A document whose payload file is
//! present and readable is never fetched again.

mod filename;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::fetch::{FetchError, HttpClient};
use crate::resolver::ResolutionRecord;
use crate::state::write_atomic;

pub use filename::{FALLBACK_FILENAME, display_filename};

/// Name of the per-document manifest file.
pub const MANIFEST_FILE_NAME: &str = "info.json";

/// Errors that abort a document pass.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Fetching the XML asset failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A storage path could not be created or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest could not be serialized.
    #[error("failed to serialize manifest {path}: {source}")]
    Serialize {
        /// Manifest path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The record has no XML asset to fetch.
    #[error("resolution record has no XML asset: {uri}")]
    MissingAsset {
        /// The landing-page URI of the record.
        uri: String,
    },
}

impl DocumentError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Contents of a document's `info.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// The resolution record the document was fetched from.
    #[serde(flatten)]
    pub record: ResolutionRecord,
    /// Name of the payload file in the same directory.
    pub filename: String,
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The payload was downloaded and written.
    Fetched {
        /// Payload path.
        path: PathBuf,
    },
    /// The payload was already on disk; nothing was requested.
    AlreadyPresent {
        /// Payload path.
        path: PathBuf,
    },
}

/// Counters from one document pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Documents downloaded in this pass.
    pub fetched: usize,
    /// Documents skipped because their payload was already stored.
    pub already_present: usize,
}

/// Downloads XML assets into content-addressed directories.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    root: PathBuf,
}

impl DocumentFetcher {
    /// Creates a fetcher storing documents under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the document root under `data_dir`.
    #[must_use]
    pub fn root_for(data_dir: &Path) -> PathBuf {
        data_dir.join("documents")
    }

    /// Returns the storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lowercase hex SHA-256 of `xml_uri`.
    #[must_use]
    pub fn content_address(xml_uri: &str) -> String {
        format!("{:x}", Sha256::digest(xml_uri.as_bytes()))
    }

    /// Returns the directory holding the document for `xml_uri`.
    #[must_use]
    pub fn document_dir(&self, xml_uri: &str) -> PathBuf {
        self.root.join(Self::content_address(xml_uri))
    }

    /// Fetches every record in order, skipping documents already stored.
    ///
    /// # Errors
    ///
    /// Stops at the first failing document. Documents written before the
    /// failure stay on disk and are skipped on the next pass.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn fetch_all(
        &self,
        client: &HttpClient,
        records: &[ResolutionRecord],
    ) -> Result<FetchSummary, DocumentError> {
        let mut summary = FetchSummary::default();
        for record in records {
            match self.fetch_one(client, record).await? {
                FetchOutcome::Fetched { .. } => summary.fetched += 1,
                FetchOutcome::AlreadyPresent { .. } => summary.already_present += 1,
            }
        }
        debug!(?summary, "document pass finished");
        Ok(summary)
    }

    /// Stores the XML asset of `record` unless it is already present.
    ///
    /// The manifest is written before the payload; both are written to a
    /// temporary file and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::MissingAsset`] for a record without XML,
    /// [`DocumentError::Fetch`] if the asset cannot be fetched or is an error
    /// page, and [`DocumentError::Io`] if writing fails.
    pub async fn fetch_one(
        &self,
        client: &HttpClient,
        record: &ResolutionRecord,
    ) -> Result<FetchOutcome, DocumentError> {
        let Some(xml_uri) = record.xml_uri.as_deref() else {
            return Err(DocumentError::MissingAsset {
                uri: record.uri.clone(),
            });
        };

        let dir = self.document_dir(xml_uri);
        let filename = display_filename(xml_uri);
        let payload_path = dir.join(&filename);

        if is_readable_file(&payload_path).await {
            debug!(path = %payload_path.display(), "document already stored");
            return Ok(FetchOutcome::AlreadyPresent { path: payload_path });
        }

        let page = client.fetch(xml_uri).await?;

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| DocumentError::io(&dir, source))?;

        let manifest_path = dir.join(MANIFEST_FILE_NAME);
        let manifest = Manifest {
            record: record.clone(),
            filename,
        };
        let mut json = serde_json::to_vec_pretty(&manifest).map_err(|source| {
            DocumentError::Serialize {
                path: manifest_path.clone(),
                source,
            }
        })?;
        json.push(b'\n');
        write_atomic(&manifest_path, &json)
            .map_err(|source| DocumentError::io(&manifest_path, source))?;
        write_atomic(&payload_path, &page.body)
            .map_err(|source| DocumentError::io(&payload_path, source))?;

        info!(
            uri = %xml_uri,
            path = %payload_path.display(),
            bytes = page.body.len(),
            "document stored"
        );
        Ok(FetchOutcome::Fetched { path: payload_path })
    }
}

async fn is_readable_file(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => tokio::fs::File::open(path).await.is_ok(),
        _ => false,
    }
}
