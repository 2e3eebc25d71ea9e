//! The three-stage crawl: paginate, resolve, fetch.
//!
//! Stages run strictly one after another with one request in flight at a time.
//! All queries are paginated (and their state flushed) before any landing page
//! is resolved; resolution completes before any document is fetched.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::document::{DocumentError, DocumentFetcher, FetchSummary};
use crate::fetch::HttpClient;
use crate::query::{PaginationMode, PaginationOutcome, QueryError, QueryPaginator, StopReason};
use crate::resolver::{ResolutionState, ResolveError, ResolveSummary, Resolver};
use crate::service::{QuerySpec, ServiceConfig};

/// A fatal crawl error.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// A query failed during pagination or check-URI derivation.
    #[error("query '{query}' failed: {source}")]
    Query {
        /// The query name.
        query: String,
        /// Underlying error.
        #[source]
        source: QueryError,
    },

    /// The resolution stage failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The document stage failed.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The crawl was interrupted; state of the running stage was saved.
    #[error("crawl interrupted")]
    Interrupted,
}

impl HarvestError {
    fn query(query: impl Into<String>, source: QueryError) -> Self {
        Self::Query {
            query: query.into(),
            source,
        }
    }
}

/// Where crawl state and documents live.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    /// Lays out crawl data under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the data directory; per-query state lives in `queries/` below it.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of the shared resolution state.
    #[must_use]
    pub fn resolution_state(&self) -> PathBuf {
        ResolutionState::path_for(&self.root)
    }

    /// Returns the content-addressed document store.
    #[must_use]
    pub fn documents(&self) -> PathBuf {
        DocumentFetcher::root_for(&self.root)
    }
}

/// Per-run crawl switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Keep paginating past pages with no new results.
    pub full: bool,
    /// First feed page to request.
    pub start_page: u32,
    /// Re-check landing pages previously found without an XML asset.
    pub retry_unresolved: bool,
}

impl CrawlOptions {
    fn mode(self) -> PaginationMode {
        if self.full {
            PaginationMode::Full
        } else {
            PaginationMode::Incremental
        }
    }
}

/// What a crawl did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    /// Pagination outcome per query, in run order.
    pub queries: Vec<(String, PaginationOutcome)>,
    /// Distinct landing pages across all queries.
    pub check_uris: usize,
    /// Resolution counters.
    pub resolve: ResolveSummary,
    /// Document counters.
    pub documents: FetchSummary,
}

/// Runs the crawl pipeline against one service and data directory.
#[derive(Debug)]
pub struct Harvester {
    client: HttpClient,
    service: ServiceConfig,
    layout: DataLayout,
}

impl Harvester {
    /// Creates a harvester.
    pub fn new(client: HttpClient, service: ServiceConfig, layout: DataLayout) -> Self {
        Self {
            client,
            service,
            layout,
        }
    }

    /// Returns the data layout.
    #[must_use]
    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Runs [`run`](Self::run) until it finishes or `shutdown` completes.
    ///
    /// On shutdown the crawl future is dropped, which saves the state of the
    /// stage in progress, and [`HarvestError::Interrupted`] is returned.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Interrupted`] on shutdown, otherwise whatever
    /// [`run`](Self::run) returns.
    pub async fn run_until<F>(
        &self,
        queries: &[QuerySpec],
        options: CrawlOptions,
        shutdown: F,
    ) -> Result<HarvestSummary, HarvestError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run(queries, options) => result,
            () = shutdown => {
                warn!("crawl interrupted");
                Err(HarvestError::Interrupted)
            }
        }
    }

    /// Crawls `queries`: paginates each, resolves the union of their landing
    /// pages, then fetches every resolved XML document.
    ///
    /// A malformed feed page only ends that query's pagination. Every other
    /// failure aborts the run after the current stage has saved its state.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] naming the stage that failed.
    #[instrument(skip_all, fields(queries = queries.len(), full = options.full))]
    pub async fn run(
        &self,
        queries: &[QuerySpec],
        options: CrawlOptions,
    ) -> Result<HarvestSummary, HarvestError> {
        let resolver = Resolver::new(&self.service.origin)?;
        let mut summary = HarvestSummary::default();

        let mut check_uris = BTreeSet::new();
        for query in queries {
            let mut paginator = QueryPaginator::open(query, &self.service, self.layout.root());
            let outcome = paginator
                .paginate(&self.client, options.start_page, options.mode())
                .await
                .map_err(|source| HarvestError::query(&query.name, source))?;
            if let StopReason::MalformedFeed { page, reason } = &outcome.stop {
                warn!(
                    query = %query.name,
                    page,
                    reason = %reason,
                    "query ended on malformed feed page"
                );
            }
            info!(
                query = %query.name,
                pages = outcome.pages_fetched,
                new_results = outcome.new_results,
                known = paginator.state().len(),
                "query paginated"
            );

            let uris = paginator
                .check_uris()
                .map_err(|source| HarvestError::query(&query.name, source))?;
            check_uris.extend(uris);
            summary.queries.push((query.name.clone(), outcome));
        }
        summary.check_uris = check_uris.len();

        let mut resolution = ResolutionState::load(self.layout.resolution_state());
        summary.resolve = resolver
            .resolve_all(
                &self.client,
                &mut resolution,
                &check_uris,
                options.retry_unresolved,
            )
            .await?;
        info!(
            checked = summary.resolve.checked,
            with_xml = summary.resolve.with_xml,
            skipped = summary.resolve.skipped,
            "landing pages resolved"
        );

        let fetcher = DocumentFetcher::new(self.layout.documents());
        summary.documents = fetcher
            .fetch_all(&self.client, &resolution.xml_records())
            .await?;
        info!(
            fetched = summary.documents.fetched,
            already_present = summary.documents.already_present,
            "documents stored"
        );

        Ok(summary)
    }
}
