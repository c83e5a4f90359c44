//! # bboxes
//!
//! Text bounding boxes from PDF, spreadsheet, word processor and plain text
//! sources, normalized into one entity model.
//!
//! Every format is reduced to the same rows: a document, its pages, the
//! deduplicated fonts and styles text is rendered with, and one bounding box
//! per text run. Rows reference each other by dense 1-based ids, and every
//! reference resolves.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bboxes::{open, render, Collection};
//!
//! fn main() -> bboxes::Result<()> {
//!     let data = std::fs::read("report.xlsx")?;
//!     let mut cursor = open(data)?;
//!
//!     for style in cursor.styles()? {
//!         println!("style {}: {}pt {}", style.style_id, style.font_size, style.color);
//!     }
//!
//!     // Stream the boxes to stdout, one JSON object per line
//!     let stdout = std::io::stdout();
//!     render::write_json_lines(&mut cursor, Collection::BBoxes, stdout.lock())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Format detection**: PDF, XLSX, DOCX and plain text from the leading bytes
//! - **Lazy cursor**: nothing is parsed until first access
//! - **Streaming**: bounding boxes are produced on demand with backpressure
//! - **Parallel decoding**: PDF pages are decoded with Rayon
//! - **Two transports**: eager JSON and JSON lines with identical field names

pub mod cursor;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use cursor::{BBoxStream, Cursor};
pub use detect::{detect, info, Confidence, FormatInfo};
pub use error::{Error, Result};
pub use model::{
    BBox, BBoxExt, Document, DocumentModel, EntityInterner, Font, FontIdentity, IngestStats,
    Page, SourceType, Style,
};
pub use parser::{
    Decoder, ErrorMode, ExtractOptions, Extraction, PageGeometry, PageSelection, RawFont,
    RawStyle, RunEvent, RunEventStream, RunSink,
};
pub use render::{Collection, JsonFormat, Record};

use std::path::Path;

/// Open a document from bytes, detecting its format.
///
/// Format and document level errors are reported here.
///
/// # Example
///
/// ```
/// let mut cursor = bboxes::open(b"Hello\nWorld\n".to_vec()).unwrap();
/// assert_eq!(cursor.doc().unwrap().page_count, 1);
/// assert_eq!(cursor.bboxes().unwrap().count(), 2);
/// ```
pub fn open(data: impl Into<Vec<u8>>) -> Result<Cursor> {
    Cursor::open(data, ExtractOptions::default())
}

/// Open a document from bytes with custom options.
///
/// # Example
///
/// ```no_run
/// use bboxes::{open_with_options, ExtractOptions, PageSelection};
///
/// let data = std::fs::read("encrypted.pdf").unwrap();
/// let options = ExtractOptions::new()
///     .with_password("secret")
///     .with_pages(PageSelection::parse("1-3").unwrap())
///     .lenient();
/// let cursor = open_with_options(data, options).unwrap();
/// ```
pub fn open_with_options(data: impl Into<Vec<u8>>, options: ExtractOptions) -> Result<Cursor> {
    Cursor::open(data, options)
}

/// Open a document file. The file name is recorded on the document row.
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Cursor> {
    open_file_with_options(path, ExtractOptions::default())
}

/// Open a document file with custom options.
///
/// An explicit filename in `options` takes precedence over the path's.
pub fn open_file_with_options<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Cursor> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let options = match path.file_name() {
        Some(name) if options.filename.is_none() => options.with_filename(name.to_string_lossy()),
        _ => options,
    };
    Cursor::open(data, options)
}

/// Document row of `data` as JSON.
pub fn doc_json(data: &[u8], format: JsonFormat) -> Result<String> {
    collection_json(data, Collection::Doc, format)
}

/// Page rows of `data` as a JSON array.
pub fn pages_json(data: &[u8], format: JsonFormat) -> Result<String> {
    collection_json(data, Collection::Pages, format)
}

/// Fonts of `data` as a JSON array.
pub fn fonts_json(data: &[u8], format: JsonFormat) -> Result<String> {
    collection_json(data, Collection::Fonts, format)
}

/// Styles of `data` as a JSON array.
pub fn styles_json(data: &[u8], format: JsonFormat) -> Result<String> {
    collection_json(data, Collection::Styles, format)
}

/// Bounding boxes of `data` as a JSON array.
///
/// # Example
///
/// ```
/// use bboxes::{bboxes_json, JsonFormat};
///
/// let json = bboxes_json(b"Hello\n", JsonFormat::Compact).unwrap();
/// assert!(json.starts_with("[{\"bbox_id\":1"));
/// ```
pub fn bboxes_json(data: &[u8], format: JsonFormat) -> Result<String> {
    collection_json(data, Collection::BBoxes, format)
}

fn collection_json(data: &[u8], collection: Collection, format: JsonFormat) -> Result<String> {
    let mut cursor = open(data)?;
    let json = render::to_json(&mut cursor, collection, format);
    cursor.close();
    json
}
