//! Display filenames for stored documents.

use std::path::{Component, Path};

use url::Url;

use super::MANIFEST_FILE_NAME;

/// Filename used when an asset URI yields nothing usable.
pub const FALLBACK_FILENAME: &str = "document.xml";

/// Derives the on-disk filename of a document from its asset URI.
///
/// Takes the last path segment, drops `;key=value` parameters, percent-decodes
/// the rest and replaces characters that cannot appear in a single path
/// component. Falls back to [`FALLBACK_FILENAME`] when the result is empty, a
/// dot segment, or would collide with the manifest.
#[must_use]
pub fn display_filename(asset_uri: &str) -> String {
    let segment = last_path_segment(asset_uri);
    let segment = segment.split(';').next().unwrap_or_default();
    let decoded = urlencoding::decode(segment)
        .map_or_else(|_| segment.to_string(), std::borrow::Cow::into_owned);
    let name = sanitize_filename(decoded.trim());

    if name.is_empty() || name == MANIFEST_FILE_NAME || !is_safe_filename_segment(&name) {
        return FALLBACK_FILENAME.to_string();
    }
    name
}

fn last_path_segment(uri: &str) -> String {
    if let Ok(url) = Url::parse(uri)
        && let Some(mut segments) = url.path_segments()
        && let Some(last) = segments.next_back()
    {
        return last.to_string();
    }
    let path = uri.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default().to_string()
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
