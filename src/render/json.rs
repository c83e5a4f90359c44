//! Eager JSON encoding of one collection.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::cursor::Cursor;
use crate::error::{Error, Result};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// One of the entity collections a cursor exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// The single document row
    Doc,
    /// Page rows
    Pages,
    /// Interned fonts
    Fonts,
    /// Interned styles
    Styles,
    /// Bounding boxes
    BBoxes,
}

impl Collection {
    /// All collections, in record order.
    pub const ALL: [Collection; 5] = [
        Collection::Doc,
        Collection::Pages,
        Collection::Fonts,
        Collection::Styles,
        Collection::BBoxes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Doc => "doc",
            Collection::Pages => "pages",
            Collection::Fonts => "fonts",
            Collection::Styles => "styles",
            Collection::BBoxes => "bboxes",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Render(format!("unknown collection: {}", s)))
    }
}

/// Encode one collection of the cursor as a single JSON value.
///
/// The document is an object; every other collection is an array in id
/// order. Fonts, styles and bounding boxes ingest the whole document first.
pub fn to_json(cursor: &mut Cursor, collection: Collection, format: JsonFormat) -> Result<String> {
    match collection {
        Collection::Doc => encode(&cursor.doc()?, format),
        Collection::Pages => encode(cursor.pages()?, format),
        Collection::Fonts => encode(cursor.fonts()?, format),
        Collection::Styles => encode(cursor.styles()?, format),
        Collection::BBoxes => encode(cursor.bboxes()?.as_slice(), format),
    }
}

fn encode<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}
