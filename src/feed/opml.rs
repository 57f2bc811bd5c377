use std::path::Path;

use quick_xml::encoding::Decoder;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors that can occur during OPML parsing.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// The document ended before every element was closed.
    #[error("XML parse error: document ends inside an open element")]
    Unterminated,

    /// The document contains no root element at all.
    #[error("XML parse error: no root element")]
    NoRootElement,

    /// File I/O error.
    #[error("Failed to read OPML file: {0}")]
    Io(#[from] std::io::Error),
}

/// A feed subscription extracted from an OPML file.
///
/// Represents a single `<outline>` element with an `xmlUrl` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpmlFeed {
    /// Display title for the feed. Sourced from `title` attribute,
    /// falling back to `text` attribute, then to the XML URL itself.
    pub title: String,
    /// URL of the RSS/Atom feed, exactly as written in the document.
    pub xml_url: String,
}

/// Parses an OPML file from disk and extracts feed subscriptions.
///
/// Every `<outline>` carrying an `xmlUrl` attribute yields one [`OpmlFeed`],
/// in document order and regardless of nesting depth. Folder outlines
/// without `xmlUrl` are traversed but not returned.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The content is not well-formed XML
///
/// # Security
///
/// XXE (XML External Entity) attacks are mitigated because `quick-xml` (0.37) does not
/// parse `<!ENTITY>` declarations. Custom entities cause `EscapeError::UnrecognizedEntity`.
pub async fn parse(path: &Path) -> Result<Vec<OpmlFeed>, OpmlError> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_opml_content(&content)
}

/// Parses OPML content string and extracts feed subscriptions.
pub(crate) fn parse_opml_content(content: &str) -> Result<Vec<OpmlFeed>, OpmlError> {
    // SEC-002: quick-xml (0.37) only resolves the 5 XML builtin entities; anything
    // declared in a DOCTYPE surfaces as an error from `decode_and_unescape_value()`.
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut feeds = Vec::new();
    let mut buf = Vec::new();
    let mut open_elements: usize = 0;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                saw_root = true;
                open_elements += 1;
                if e.name().as_ref() == b"outline" {
                    if let Some(feed) = parse_outline_attributes(&e, &reader)? {
                        feeds.push(feed);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                saw_root = true;
                if e.name().as_ref() == b"outline" {
                    if let Some(feed) = parse_outline_attributes(&e, &reader)? {
                        feeds.push(feed);
                    }
                }
            }
            Ok(Event::End(_)) => {
                open_elements = open_elements.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpmlError::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(OpmlError::NoRootElement);
    }
    if open_elements > 0 {
        return Err(OpmlError::Unterminated);
    }

    Ok(feeds)
}

/// Extracts feed attributes from an outline element.
///
/// Returns `Some(OpmlFeed)` if the outline has an `xmlUrl` attribute,
/// `None` for category/folder outlines without feed URLs.
fn parse_outline_attributes(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<Option<OpmlFeed>, OpmlError> {
    let mut xml_url = None;
    let mut title = None;
    let decoder = reader.decoder();

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| OpmlError::XmlParse(e.to_string()))?;
        match attr.key.as_ref() {
            b"xmlUrl" => xml_url = Some(decode_value(&attr, decoder)?),
            b"title" => title = Some(decode_value(&attr, decoder)?),
            b"text" => {
                if title.is_none() {
                    title = Some(decode_value(&attr, decoder)?);
                }
            }
            _ => {}
        }
    }

    Ok(xml_url.map(|url| OpmlFeed {
        title: title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| url.clone()),
        xml_url: url,
    }))
}

fn decode_value(attr: &Attribute<'_>, decoder: Decoder) -> Result<String, OpmlError> {
    attr.decode_and_unescape_value(decoder)
        .map(|v| v.into_owned())
        .map_err(|e| OpmlError::XmlParse(e.to_string()))
}
