//! Session header summary of stored Hansard XML documents.

use std::fmt;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

/// Children of `/hansard/session.header` that make up the summary line, in order.
pub const HEADER_FIELDS: [&str; 6] = [
    "date",
    "parliament.no",
    "session.no",
    "chamber",
    "page.no",
    "proof",
];

/// Shown for an element that has no text.
pub const EMPTY_VALUE: &str = "---";

const HEADER_PATH: [&str; 2] = ["hansard", "session.header"];

/// Errors reading a Hansard document.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed XML.
    #[error("failed to parse {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    /// The document ended with elements still open.
    #[error("failed to parse {path}: document is truncated")]
    Truncated { path: PathBuf },
}

/// Header values of one sitting, every field possibly repeated or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHeader {
    values: [Vec<String>; HEADER_FIELDS.len()],
}

impl SessionHeader {
    /// Reads and parses the header of the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError`] naming the file if it cannot be read or parsed.
    pub fn read(path: &Path) -> Result<Self, HeaderError> {
        let bytes = std::fs::read(path).map_err(|source| HeaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&bytes, path)
    }

    /// Parses the header from an in-memory document; `path` is used in errors.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::Xml`] or [`HeaderError::Truncated`] for a broken document.
    pub fn parse(xml: &[u8], path: &Path) -> Result<Self, HeaderError> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        let mut stack: Vec<String> = Vec::new();
        let mut header = Self::default();
        // Field index and the text collected before its first child element.
        let mut current: Option<(usize, String, bool)> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(start)) => {
                    if let Some((_, _, closed)) = current.as_mut() {
                        *closed = true;
                    }
                    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                    stack.push(name);
                    if current.is_none()
                        && let Some(index) = field_at(&stack)
                    {
                        current = Some((index, String::new(), false));
                    }
                }
                Ok(Event::Empty(empty)) => {
                    if let Some((_, _, closed)) = current.as_mut() {
                        *closed = true;
                    }
                    let name = String::from_utf8_lossy(empty.local_name().as_ref()).into_owned();
                    stack.push(name);
                    if current.is_none()
                        && let Some(index) = field_at(&stack)
                    {
                        header.values[index].push(EMPTY_VALUE.to_string());
                    }
                    stack.pop();
                }
                Ok(Event::Text(text)) => {
                    if let Some((_, value, false)) = current.as_mut() {
                        match text.unescape() {
                            Ok(unescaped) => value.push_str(&unescaped),
                            Err(_) => value.push_str(&String::from_utf8_lossy(&text)),
                        }
                    }
                }
                Ok(Event::CData(cdata)) => {
                    if let Some((_, value, false)) = current.as_mut() {
                        value.push_str(&String::from_utf8_lossy(&cdata));
                    }
                }
                Ok(Event::End(_)) => {
                    if field_at(&stack).is_some()
                        && let Some((index, value, _)) = current.take()
                    {
                        header.values[index].push(display_value(&value));
                    }
                    stack.pop();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(source) => {
                    return Err(HeaderError::Xml {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(HeaderError::Truncated {
                path: path.to_path_buf(),
            });
        }
        Ok(header)
    }

    /// Returns the values found for `field`, in document order.
    #[must_use]
    pub fn values(&self, field: &str) -> &[String] {
        HEADER_FIELDS
            .iter()
            .position(|candidate| *candidate == field)
            .map_or(&[], |index| self.values[index].as_slice())
    }
}

impl fmt::Display for SessionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, field) in HEADER_FIELDS.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{field}={}", self.values[index].join(", "))?;
        }
        Ok(())
    }
}

fn field_at(stack: &[String]) -> Option<usize> {
    let [root, header, field] = stack else {
        return None;
    };
    if root != HEADER_PATH[0] || header != HEADER_PATH[1] {
        return None;
    }
    HEADER_FIELDS.iter().position(|candidate| candidate == field)
}

fn display_value(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        EMPTY_VALUE.to_string()
    } else {
        trimmed.to_string()
    }
}
