//! Tolerant RSS feed parsing.
//!
//! Items are read loosely: `title` and `guid` are optional, trimmed, and an
//! item missing either is still an item. Only a broken document (malformed XML,
//! a root element that is not a feed, truncated input) is a parse failure.

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

/// One `<item>` of a search result feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    /// Item title, trimmed; `None` when absent or blank.
    pub title: Option<String>,
    /// Result-page identifier, trimmed; `None` when absent or blank.
    pub guid: Option<String>,
}

/// A feed page that could not be read as a feed at all.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The document is not well-formed XML.
    #[error("malformed feed XML: {source}")]
    Xml {
        /// The underlying XML error.
        #[source]
        source: quick_xml::Error,
    },

    /// The document root is not an RSS element.
    #[error("unexpected feed root element <{found}>")]
    UnexpectedRoot {
        /// Local name of the root element found.
        found: String,
    },

    /// The document has no root element.
    #[error("feed document is empty")]
    MissingRoot,

    /// The document ended with elements still open.
    #[error("feed document is truncated")]
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Guid,
}

/// Parses a feed page into its items.
///
/// # Errors
///
/// Returns [`FeedError`] when the document is not a well-formed RSS feed.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, FeedError> {
    let mut reader = Reader::from_str(xml);

    let mut items = Vec::new();
    let mut depth: usize = 0;
    let mut seen_root = false;
    let mut item: Option<FeedItem> = None;
    let mut item_depth = 0;
    let mut field: Option<(Field, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = start.local_name();
                if !seen_root {
                    check_root(name.as_ref())?;
                    seen_root = true;
                }
                depth += 1;
                match name.as_ref() {
                    b"item" if item.is_none() => {
                        item = Some(FeedItem::default());
                        item_depth = depth;
                    }
                    b"title" if item.is_some() && depth == item_depth + 1 => {
                        field = Some((Field::Title, String::new()));
                    }
                    b"guid" if item.is_some() && depth == item_depth + 1 => {
                        field = Some((Field::Guid, String::new()));
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(empty)) => {
                if !seen_root {
                    check_root(empty.local_name().as_ref())?;
                    seen_root = true;
                } else if item.is_none() && empty.local_name().as_ref() == b"item" {
                    items.push(FeedItem::default());
                }
            }
            Ok(Event::Text(text)) => {
                if let Some((_, buffer)) = field.as_mut() {
                    match text.unescape() {
                        Ok(unescaped) => buffer.push_str(&unescaped),
                        Err(_) => buffer.push_str(&String::from_utf8_lossy(&text)),
                    }
                }
            }
            Ok(Event::CData(cdata)) => {
                if let Some((_, buffer)) = field.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Ok(Event::End(_)) => {
                if depth == item_depth + 1
                    && let Some((kind, buffer)) = field.take()
                {
                    if let Some(current) = item.as_mut() {
                        let value = non_blank(&buffer);
                        match kind {
                            Field::Title => current.title = value,
                            Field::Guid => current.guid = value,
                        }
                    }
                } else if item.is_some() && depth == item_depth {
                    items.extend(item.take());
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(source) => return Err(FeedError::Xml { source }),
        }
    }

    if !seen_root {
        return Err(FeedError::MissingRoot);
    }
    if depth != 0 {
        return Err(FeedError::Truncated);
    }
    Ok(items)
}

fn check_root(name: &[u8]) -> Result<(), FeedError> {
    match name {
        b"rss" | b"RDF" => Ok(()),
        other => Err(FeedError::UnexpectedRoot {
            found: String::from_utf8_lossy(other).into_owned(),
        }),
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
