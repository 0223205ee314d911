//! Style listings and SLD validation.

use camino::Utf8Path;
use layerfeed_core::CatalogError;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use serde::de::IgnoredAny;

#[derive(Debug, Deserialize)]
struct StyleListing {
    styles: StyleCollection,
}

// The catalog renders an empty collection as `"styles": ""`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StyleCollection {
    Populated {
        #[serde(default)]
        style: Vec<StyleRef>,
    },
    Empty(IgnoredAny),
}

#[derive(Debug, Deserialize)]
struct StyleRef {
    name: String,
}

/// Names in a `styles.json` listing.
pub(crate) fn style_names(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let listing: StyleListing = serde_json::from_str(body)?;
    Ok(match listing.styles {
        StyleCollection::Populated { style } => style.into_iter().map(|entry| entry.name).collect(),
        StyleCollection::Empty(_) => Vec::new(),
    })
}

/// Read the SLD at `path` and check it is well-formed XML with a root element.
pub(crate) fn read_style_document(path: &Utf8Path) -> Result<Vec<u8>, CatalogError> {
    let invalid = |reason: String| CatalogError::Validation {
        path: path.to_owned(),
        reason,
    };
    let bytes = layerfeed_fs::read_file(path).map_err(|err| invalid(format!("unreadable: {err}")))?;
    check_well_formed(&bytes).map_err(invalid)?;
    Ok(bytes)
}

fn check_well_formed(bytes: &[u8]) -> Result<(), String> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut roots: usize = 0;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Empty(_)) if depth == 0 => roots += 1,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(format!(
                    "malformed XML at byte {}: {err}",
                    reader.buffer_position()
                ));
            }
        }
        buf.clear();
    }
    match (roots, depth) {
        (0, _) => Err("document has no root element".to_owned()),
        (_, open) if open > 0 => Err(format!("{open} element(s) left unclosed")),
        (1, _) => Ok(()),
        (count, _) => Err(format!("document has {count} root elements")),
    }
}
