//! ParlInfo service endpoints and the named queries harvested from it.

use std::collections::BTreeMap;

/// RSS search feed endpoint.
pub const DEFAULT_FEED_URL: &str = "https://parlinfo.aph.gov.au/parlInfo/feeds/rss.w3p";

/// Origin that relative links on landing pages are resolved against.
pub const DEFAULT_ORIGIN: &str = "https://parlinfo.aph.gov.au";

/// Feed ordering; the incremental stop condition relies on newest-first results.
pub const DEFAULT_ORDER_BY: &str = "date-eFirst";

/// Results requested per feed page.
pub const DEFAULT_RESULTS_PER_PAGE: u32 = 100;

/// Built-in query set: name and ParlInfo query expression.
pub const DEFAULT_QUERIES: [(&str, &str); 4] = [
    ("hansardr", "(Dataset:hansardr)"),
    ("hansards", "(Dataset:hansards)"),
    ("hansardr80", "(Dataset:hansardr80)"),
    ("hansards80", "(Dataset:hansards80)"),
];

/// Where and how to talk to the search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// RSS search feed endpoint.
    pub feed_url: String,
    /// Origin for resolving relative landing-page links.
    pub origin: String,
    /// Value of the `orderBy` feed argument.
    pub order_by: String,
    /// Value of the `resCount` feed argument.
    pub results_per_page: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            order_by: DEFAULT_ORDER_BY.to_string(),
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
        }
    }
}

impl ServiceConfig {
    /// Builds the immutable feed arguments for a query expression.
    ///
    /// The page number is added per request by the paginator.
    #[must_use]
    pub fn feed_args(&self, expression: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("orderBy".to_string(), self.order_by.clone()),
            ("query".to_string(), expression.to_string()),
            ("resCount".to_string(), self.results_per_page.to_string()),
        ])
    }
}

/// A named search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Name used for logging and for the query's state file.
    pub name: String,
    /// ParlInfo query expression, e.g. `(Dataset:hansardr)`.
    pub expression: String,
}

impl QuerySpec {
    /// Creates a query spec.
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

/// Returns the built-in query set keyed by name.
#[must_use]
pub fn default_queries() -> BTreeMap<String, String> {
    DEFAULT_QUERIES
        .iter()
        .map(|(name, expression)| ((*name).to_string(), (*expression).to_string()))
        .collect()
}
