//! Search feed pagination with persisted, monotone per-query state.
//!
//! A [`QueryPaginator`] owns the [`QueryState`] of one named query for the
//! duration of a run. Each call to [`QueryPaginator::paginate`] walks the feed
//! from a starting page, records every result page not seen before, and stops
//! when the feed is exhausted or, in incremental mode, when a whole page brought
//! nothing new.
//!
//! Incremental mode assumes the feed is ordered newest-first. If the upstream
//! ever reorders results, a page of known items no longer implies every later
//! page is known; run in [`PaginationMode::Full`] to recover.

mod check;
mod feed;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::fetch::{FetchError, HttpClient};
use crate::service::{QuerySpec, ServiceConfig};
use crate::state::{FlushGuard, Persist, StateError, load_map, save_map};

pub use check::{derive_check_uris, document_prefix};
pub use feed::{FeedError, FeedItem, parse_feed};

/// Errors that end a query's pagination or check-URI derivation.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Fetching a feed page failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Persisting the query state failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// A stored result URI has no document identifier.
    #[error("result URI carries no document identifier: {uri}")]
    InconsistentIdentifier {
        /// The offending URI.
        uri: String,
    },
}

impl QueryError {
    /// Creates an inconsistent-identifier error.
    pub fn inconsistent(uri: impl Into<String>) -> Self {
        Self::InconsistentIdentifier { uri: uri.into() }
    }
}

/// How far pagination goes once pages stop yielding new results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaginationMode {
    /// Stop at the first page with no new results.
    #[default]
    Incremental,
    /// Continue until the feed returns an empty page.
    Full,
}

/// Why pagination ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The page contained no items.
    Exhausted {
        /// The empty page.
        page: u32,
    },
    /// Incremental mode found a page whose items were all known.
    Unchanged {
        /// The page with no new items.
        page: u32,
    },
    /// The page could not be parsed as a feed.
    MalformedFeed {
        /// The page that failed to parse.
        page: u32,
        /// Parser error message.
        reason: String,
    },
}

/// Result of one pagination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOutcome {
    /// Number of feed pages fetched.
    pub pages_fetched: u32,
    /// Number of result pages added to the state.
    pub new_results: usize,
    /// Why the walk ended.
    pub stop: StopReason,
}

/// Persisted result pages of one query: result-page URI to title.
#[derive(Debug)]
pub struct QueryState {
    path: PathBuf,
    result_pages: BTreeMap<String, String>,
    dirty: bool,
}

impl QueryState {
    /// Loads the state at `path`, or starts empty if absent or corrupt.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let result_pages = load_map(&path);
        Self {
            path,
            result_pages,
            dirty: false,
        }
    }

    /// Returns the state file location of the query `name` under `data_dir`.
    ///
    /// The name is URI-escaped so any name is a single safe path component.
    #[must_use]
    pub fn path_for(data_dir: &Path, name: &str) -> PathBuf {
        data_dir
            .join("queries")
            .join(format!("{}.json", urlencoding::encode(name)))
    }

    /// Records a result page; returns `true` if it was not known before.
    ///
    /// Existing entries are never replaced or removed.
    pub fn insert(&mut self, uri: String, title: String) -> bool {
        if self.result_pages.contains_key(&uri) {
            return false;
        }
        self.result_pages.insert(uri, title);
        self.dirty = true;
        true
    }

    /// Returns the known result pages.
    #[must_use]
    pub fn result_pages(&self) -> &BTreeMap<String, String> {
        &self.result_pages
    }

    /// Returns the number of known result pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.result_pages.len()
    }

    /// Returns `true` if no result pages are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.result_pages.is_empty()
    }

    /// Returns `true` if there are unsaved changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the state file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persist for QueryState {
    fn flush(&mut self) -> Result<(), StateError> {
        if !self.dirty {
            return Ok(());
        }
        save_map(&self.path, &self.result_pages)?;
        self.dirty = false;
        Ok(())
    }
}

/// Builds the URI of one feed page.
///
/// `page` is added to a copy of `args`; every key and value is URI-escaped and
/// appended to `base` as a `;key=value` segment in key order.
#[must_use]
pub fn page_uri(base: &str, args: &BTreeMap<String, String>, page: u32) -> String {
    let mut args = args.clone();
    args.insert("page".to_string(), page.to_string());

    let mut uri = base.to_string();
    for (key, value) in &args {
        uri.push(';');
        uri.push_str(&urlencoding::encode(key));
        uri.push('=');
        uri.push_str(&urlencoding::encode(value));
    }
    uri
}

/// Walks the search feed of one named query.
#[derive(Debug)]
pub struct QueryPaginator {
    name: String,
    base: String,
    args: BTreeMap<String, String>,
    state: QueryState,
}

impl QueryPaginator {
    /// Opens the paginator for `query`, loading its state from `data_dir`.
    #[must_use]
    pub fn open(query: &QuerySpec, service: &ServiceConfig, data_dir: &Path) -> Self {
        let state = QueryState::load(QueryState::path_for(data_dir, &query.name));
        debug!(query = %query.name, known = state.len(), "query state loaded");
        Self {
            name: query.name.clone(),
            base: service.feed_url.clone(),
            args: service.feed_args(&query.expression),
            state,
        }
    }

    /// Returns the query name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the query state.
    #[must_use]
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Returns the URI of feed page `page` for this query.
    #[must_use]
    pub fn page_uri(&self, page: u32) -> String {
        page_uri(&self.base, &self.args, page)
    }

    /// Walks the feed from `start_page` until a stop condition holds.
    ///
    /// The query state is flushed (if dirty) on every exit path. A page that
    /// fails to parse ends the walk with [`StopReason::MalformedFeed`] rather
    /// than an error.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Fetch`] if a page cannot be fetched or is an error
    /// page, and [`QueryError::State`] if the final flush fails.
    #[instrument(skip(self, client), fields(query = %self.name))]
    pub async fn paginate(
        &mut self,
        client: &HttpClient,
        start_page: u32,
        mode: PaginationMode,
    ) -> Result<PaginationOutcome, QueryError> {
        let mut state = FlushGuard::new(&mut self.state);
        let outcome =
            walk_pages(client, &self.base, &self.args, &mut state, start_page, mode).await;
        match outcome {
            Ok(outcome) => {
                state.release()?;
                Ok(outcome)
            }
            Err(error) => Err(error),
        }
    }

    /// Returns one representative result URI per logical document.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InconsistentIdentifier`] if any stored URI has no
    /// document identifier.
    pub fn check_uris(&self) -> Result<BTreeSet<String>, QueryError> {
        derive_check_uris(self.state.result_pages().keys())
    }
}

async fn walk_pages(
    client: &HttpClient,
    base: &str,
    args: &BTreeMap<String, String>,
    state: &mut QueryState,
    start_page: u32,
    mode: PaginationMode,
) -> Result<PaginationOutcome, QueryError> {
    let mut page = start_page;
    let mut pages_fetched = 0;
    let mut new_results = 0;

    let stop = loop {
        let uri = page_uri(base, args, page);
        debug!(page, uri = %uri, "fetching feed page");
        let fetched = client.fetch(&uri).await?;
        pages_fetched += 1;

        let items = match parse_feed(&fetched.text()) {
            Ok(items) => items,
            Err(error) => {
                warn!(page, %error, "malformed feed page, ending pagination");
                break StopReason::MalformedFeed {
                    page,
                    reason: error.to_string(),
                };
            }
        };

        let found = items.len();
        let mut new = 0;
        for item in items {
            let Some(guid) = item.guid else {
                debug!(page, title = ?item.title, "feed item without guid ignored");
                continue;
            };
            if state.insert(guid, item.title.unwrap_or_default()) {
                new += 1;
            }
        }
        new_results += new;
        info!(page, found, new, "feed page processed");

        if found == 0 {
            break StopReason::Exhausted { page };
        }
        if mode == PaginationMode::Incremental && new == 0 {
            break StopReason::Unchanged { page };
        }
        page += 1;
    };

    Ok(PaginationOutcome {
        pages_fetched,
        new_results,
        stop,
    })
}
