//! Landing-page hyperlink extraction and asset selection.

use scraper::{Html, Selector};
use url::Url;

/// Marker a download link carries when it serves the XML transcript.
pub const XML_ASSET_MARKER: &str = "fileType=text%2Fxml";

/// Marker a download link carries when it serves the PDF rendering.
pub const PDF_ASSET_MARKER: &str = "fileType=application%2Fpdf";

/// Asset links found on one landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetLinks {
    /// First XML asset link, absolute.
    pub xml_uri: Option<String>,
    /// First PDF asset link that is not an in-page fragment link, absolute.
    pub pdf_uri: Option<String>,
}

fn anchor_selector() -> Selector {
    Selector::parse("a[href]")
        .unwrap_or_else(|e| panic!("invalid static selector 'a[href]': {e:?}"))
}

/// Returns every `<a href>` target in document order, resolved against `origin`.
///
/// Links that cannot be resolved to a URL are dropped.
#[must_use]
pub fn extract_links(html: &str, origin: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = anchor_selector();
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| absolutize_url(href, origin))
        .collect()
}

/// Resolves a possibly relative link against `origin`.
#[must_use]
pub fn absolutize_url(href: &str, origin: &Url) -> Option<String> {
    origin.join(href).ok().map(|url| url.to_string())
}

/// Picks the XML and PDF asset links from `links`.
///
/// The PDF viewer on the landing page links to the same PDF with a `#`
/// fragment; such links are not documents and are skipped.
#[must_use]
pub fn select_assets(links: &[String]) -> AssetLinks {
    let xml_uri = links
        .iter()
        .find(|link| link.contains(XML_ASSET_MARKER))
        .cloned();
    let pdf_uri = links
        .iter()
        .find(|link| link.contains(PDF_ASSET_MARKER) && !link.contains('#'))
        .cloned();
    AssetLinks { xml_uri, pdf_uri }
}
