//! Format backends.
//!
//! Each backend implements [`Decoder`]: source bytes in, page geometry and an
//! ordered [`RunEventStream`] out. The set of built-in formats is closed and
//! dispatched by [`decoder_for`].

mod backend;
mod docx;
mod ooxml;
mod options;
mod pdf;
mod text;
mod xlsx;

pub use backend::{
    decode_text_simple, Decoder, Extraction, PageGeometry, RawFont, RawStyle, RunEvent,
    RunEventStream, RunSink,
};
pub use docx::{DocxDecoder, DEFAULT_DOCX_FONT, DEFAULT_DOCX_FONT_SIZE};
pub use options::{ErrorMode, ExtractOptions, PageSelection, DEFAULT_CHANNEL_CAPACITY};
pub use pdf::PdfDecoder;
pub use text::{TextDecoder, TEXT_FONT, TEXT_FONT_SIZE};
pub use xlsx::{XlsxDecoder, DEFAULT_CELL_FONT, DEFAULT_CELL_FONT_SIZE};

use crate::model::SourceType;

/// Built-in decoder for a source type.
pub fn decoder_for(source_type: SourceType) -> &'static (dyn Decoder + Send + Sync) {
    match source_type {
        SourceType::Pdf => &PdfDecoder,
        SourceType::Xlsx => &XlsxDecoder,
        SourceType::Text => &TextDecoder,
        SourceType::Docx => &DocxDecoder,
    }
}
