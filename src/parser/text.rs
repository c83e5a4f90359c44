//! Plain-text backend.
//!
//! Pages are separated by form feeds, one run per non-empty line. Geometry is
//! in character cells: a line `n` characters long on line `k` of its page is
//! the box `(1, k, n, 1)`.

use crate::error::Result;
use crate::model::SourceType;

use super::backend::{
    decode_text_simple, Decoder, Extraction, PageGeometry, RawFont, RawStyle, RunEvent,
    RunEventStream,
};
use super::options::ExtractOptions;

/// Font name used for every plain-text run.
pub const TEXT_FONT: &str = "monospace";

/// Font size used for every plain-text run.
pub const TEXT_FONT_SIZE: f64 = 12.0;

const PAGE_BREAK: char = '\u{000C}';

/// Plain-text decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl Decoder for TextDecoder {
    fn source_type(&self) -> SourceType {
        SourceType::Text
    }

    fn decode(&self, data: &[u8], _options: &ExtractOptions) -> Result<Extraction> {
        let text = decode_text_simple(data);
        let font = RawFont::named(TEXT_FONT);
        let style = RawStyle::new(TEXT_FONT_SIZE);

        let mut pages = Vec::new();
        let mut runs = Vec::new();

        for (page_idx, page_text) in text.split(PAGE_BREAK).enumerate() {
            let page_index = page_idx as u32 + 1;
            let mut line_count = 0usize;
            let mut max_width = 0usize;

            for (line_idx, line) in page_text.split('\n').enumerate() {
                line_count = line_idx + 1;
                let line = line.strip_suffix('\r').unwrap_or(line);
                let width = line.chars().count();
                if width == 0 {
                    continue;
                }
                max_width = max_width.max(width);
                runs.push(RunEvent::new(
                    page_index,
                    (1.0, line_count as f64, width as f64, 1.0),
                    line,
                    font.clone(),
                    style.clone(),
                ));
            }

            // A trailing newline does not start another line.
            if page_text.ends_with('\n') {
                line_count -= 1;
            }
            pages.push(PageGeometry::new(max_width as f64, line_count as f64));
        }

        log::trace!("Text source: {} pages, {} lines", pages.len(), runs.len());
        Ok(Extraction::new(
            SourceType::Text,
            pages,
            RunEventStream::from_events(runs),
        ))
    }
}
