//! Collapsing result-page URIs to one landing page per logical document.
//!
//! A ParlInfo result URI embeds the record identifier as
//! `Id:"chamber/hansardr/2009-02-12/0001"` (percent-encoded). Every fragment of
//! one sitting shares the identifier up to the last `/`; that prefix names the
//! logical document.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use super::QueryError;

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static DOCUMENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"Id:"([^"]+)/[^/"]*""#));

/// Returns the logical-document prefix embedded in a result URI.
#[must_use]
pub fn document_prefix(uri: &str) -> Option<String> {
    let decoded = urlencoding::decode(uri).ok()?;
    DOCUMENT_ID_RE
        .captures(&decoded)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

/// Keeps one URI per logical document: the first in sorted order.
///
/// # Errors
///
/// Returns [`QueryError::InconsistentIdentifier`] if any URI carries no
/// document identifier; the whole derivation fails rather than skipping it.
pub fn derive_check_uris<'a, I>(uris: I) -> Result<BTreeSet<String>, QueryError>
where
    I: IntoIterator<Item = &'a String>,
{
    let sorted: BTreeSet<&String> = uris.into_iter().collect();
    let mut by_document: BTreeMap<String, &String> = BTreeMap::new();
    for uri in sorted {
        let prefix = document_prefix(uri).ok_or_else(|| QueryError::inconsistent(uri.as_str()))?;
        by_document.entry(prefix).or_insert(uri);
    }
    Ok(by_document.into_values().cloned().collect())
}
