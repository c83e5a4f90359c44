//! JSON-lines encoding.
//!
//! Every line is serialized on its own and released before the next one is
//! produced. Bounding boxes are pulled from the backend one at a time, so the
//! backend is paced by whoever consumes the lines and nothing beyond the
//! current box is buffered. A line that fails to serialize is logged, counted
//! and skipped.
//!
//! Reading bounding boxes this way is single-pass: once the last box line has
//! been produced the cursor is closed.

use std::io::Write;

use serde::Serialize;

use crate::cursor::Cursor;
use crate::error::Result;
use crate::model::{BBox, Document, Font, Page, Style};

use super::json::Collection;

/// One line of the combined record stream, tagged by `kind`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record<'a> {
    Doc(&'a Document),
    Page(&'a Page),
    Font(&'a Font),
    Style(&'a Style),
    BBox(&'a BBox),
}

/// Lazy JSON-lines view of one collection. Lines carry no trailing newline.
///
/// Created by [`json_lines`].
pub struct JsonLines<'a> {
    cursor: &'a mut Cursor,
    collection: Collection,
    position: usize,
    skipped: u64,
    done: bool,
}

/// Iterate one collection of the cursor as JSON lines.
pub fn json_lines(cursor: &mut Cursor, collection: Collection) -> JsonLines<'_> {
    JsonLines {
        cursor,
        collection,
        position: 0,
        skipped: 0,
        done: false,
    }
}

impl JsonLines<'_> {
    /// Serialize the next row, `None` once the collection is exhausted.
    fn next_row(&mut self) -> Result<Option<serde_json::Result<String>>> {
        // For bounding boxes `position` is the replay index of buffered boxes.
        if self.collection == Collection::BBoxes {
            let bbox = self.cursor.next_streamed(&mut self.position)?;
            return Ok(bbox.as_ref().map(serde_json::to_string));
        }

        let position = self.position;
        self.position += 1;
        let line = match self.collection {
            Collection::Doc if position == 0 => Some(serde_json::to_string(&self.cursor.doc()?)),
            Collection::Pages => self.cursor.pages()?.get(position).map(serde_json::to_string),
            Collection::Fonts => self.cursor.fonts()?.get(position).map(serde_json::to_string),
            Collection::Styles => self.cursor.styles()?.get(position).map(serde_json::to_string),
            _ => None,
        };
        Ok(line)
    }

    /// Record skipped lines and, for bounding boxes, end the single pass.
    fn finish(&mut self) {
        self.done = true;
        if self.skipped > 0 {
            if let Ok(model) = self.cursor.model_mut() {
                model.count_skipped_lines(self.skipped);
            }
            self.skipped = 0;
        }
        if self.collection == Collection::BBoxes {
            self.cursor.close();
        }
    }
}

impl Iterator for JsonLines<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.next_row() {
                Ok(Some(Ok(line))) => return Some(Ok(line)),
                Ok(Some(Err(e))) => {
                    log::warn!("Skipping {} line: {}", self.collection, e);
                    self.skipped += 1;
                }
                Ok(None) => self.finish(),
                Err(e) => {
                    self.finish();
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

impl Drop for JsonLines<'_> {
    fn drop(&mut self) {
        if !self.done && self.collection == Collection::BBoxes {
            self.finish();
        }
    }
}

/// Write one collection as newline-delimited JSON.
///
/// Returns the number of lines written.
pub fn write_json_lines<W: Write>(
    cursor: &mut Cursor,
    collection: Collection,
    writer: W,
) -> Result<u64> {
    let mut out = LineWriter::new(writer);
    for line in json_lines(cursor, collection) {
        out.write_line(&line?)?;
    }
    out.finish()
}

/// Write the whole document as one `kind`-tagged JSON-lines stream.
///
/// The document line comes first, then every page. Each bounding box is
/// preceded by the fonts and styles it is the first to reference, so every
/// referenced row precedes its referrer. Bounding boxes are read single-pass
/// and the cursor is closed at the end.
///
/// Returns the number of lines written.
pub fn write_records<W: Write>(cursor: &mut Cursor, writer: W) -> Result<u64> {
    let mut out = LineWriter::new(writer);

    let result = write_all_records(cursor, &mut out);
    if out.skipped > 0 {
        if let Ok(model) = cursor.model_mut() {
            model.count_skipped_lines(out.skipped);
        }
    }
    cursor.close();
    result?;
    out.finish()
}

fn write_all_records<W: Write>(cursor: &mut Cursor, out: &mut LineWriter<W>) -> Result<()> {
    let doc = cursor.doc()?;
    out.write_record(&Record::Doc(&doc))?;
    for page in cursor.pages()? {
        out.write_record(&Record::Page(page))?;
    }

    let mut fonts_sent = 0usize;
    let mut styles_sent = 0usize;
    let mut replayed = 0usize;

    while let Some(bbox) = cursor.next_streamed(&mut replayed)? {
        let model = cursor.model_mut()?;
        let style_end = bbox.style_id as usize;
        if style_end > styles_sent {
            let new_styles = &model.styles()[styles_sent..style_end];
            let font_end = new_styles
                .iter()
                .map(|s| s.font_id as usize)
                .max()
                .unwrap_or(0);
            if font_end > fonts_sent {
                for font in &model.fonts()[fonts_sent..font_end] {
                    out.write_record(&Record::Font(font))?;
                }
                fonts_sent = font_end;
            }
            for style in new_styles {
                out.write_record(&Record::Style(style))?;
            }
            styles_sent = style_end;
        }
        out.write_record(&Record::BBox(&bbox))?;
    }
    Ok(())
}

struct LineWriter<W> {
    writer: W,
    lines: u64,
    skipped: u64,
}

impl<W: Write> LineWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            lines: 0,
            skipped: 0,
        }
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    fn write_record(&mut self, record: &Record<'_>) -> Result<()> {
        match serde_json::to_string(record) {
            Ok(line) => self.write_line(&line),
            Err(e) => {
                log::warn!("Skipping record line: {}", e);
                self.skipped += 1;
                Ok(())
            }
        }
    }

    fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.lines)
    }
}
