//! Durable JSON state files for the harvest pipeline.
//!
//! Every piece of crawl state (per-query result pages, the shared resolution
//! map) is a JSON object keyed by string and persisted through this module.
//!
//! # Guarantees
//!
//! - [`load_map`] never fails: an absent or unparseable file yields an empty map.
//! - [`save_map`] writes to a temporary file in the target directory and renames
//!   it into place, so readers never observe a half-written file and a crash
//!   mid-save leaves the previous state intact.
//! - Maps are `BTreeMap`s, so unchanged state re-serializes byte-identically.
//!
//! Mutating stages wrap their state in a [`FlushGuard`] so the state is written
//! back on every exit path, including `?` propagation and future cancellation.

mod guard;

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

pub use guard::{FlushGuard, Persist};

/// Errors that can occur while persisting state.
#[derive(Debug, Error)]
pub enum StateError {
    /// File system error while writing or replacing the state file.
    #[error("IO error persisting state to {path}: {source}")]
    Io {
        /// The state file being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The in-memory state could not be serialized.
    #[error("failed to serialize state for {path}: {source}")]
    Serialize {
        /// The state file being written.
        path: PathBuf,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl StateError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a serialization error.
    pub fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.into(),
            source,
        }
    }
}

/// Loads a JSON object from `path`.
///
/// Returns an empty map when the file is missing or cannot be parsed; a corrupt
/// state file means "start fresh", not a fatal error.
#[must_use]
pub fn load_map<V: DeserializeOwned>(path: &Path) -> BTreeMap<String, V> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no state file yet, starting empty");
            return BTreeMap::new();
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "state file unreadable, starting empty");
            return BTreeMap::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(map) => map,
        Err(error) => {
            warn!(path = %path.display(), %error, "state file corrupt, starting empty");
            BTreeMap::new()
        }
    }
}

/// Atomically replaces `path` with the JSON serialization of `map`.
///
/// # Errors
///
/// Returns [`StateError`] if serialization fails or the file cannot be written.
pub fn save_map<V: Serialize>(path: &Path, map: &BTreeMap<String, V>) -> Result<(), StateError> {
    let mut payload =
        serde_json::to_vec_pretty(map).map_err(|e| StateError::serialize(path, e))?;
    payload.push(b'\n');
    write_atomic(path, &payload).map_err(|e| StateError::io(path, e))?;
    debug!(path = %path.display(), entries = map.len(), "state saved");
    Ok(())
}

/// Writes `contents` to a temporary file beside `path`, then renames it over `path`.
///
/// The parent directory is created if needed.
///
/// # Errors
///
/// Returns the underlying IO error from directory creation, writing, syncing or renaming.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
