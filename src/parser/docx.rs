//! Word-processor (DOCX) backend.
//!
//! Only tables are extracted: every top-level table in the document body is
//! a page, every cell a run at `(col, row, gridSpan, 1)`.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::model::{hex_color, SourceType};

use super::backend::{
    Decoder, Extraction, PageGeometry, RawFont, RawStyle, RunEvent, RunEventStream,
};
use super::ooxml::{get_attribute, is_on, open_package, read_part};
use super::options::ExtractOptions;

/// Font name for cells whose first run has no font.
pub const DEFAULT_DOCX_FONT: &str = "default";

/// Font size for cells whose first run has no size.
pub const DEFAULT_DOCX_FONT_SIZE: f64 = 12.0;

const DOCUMENT: &str = "word/document.xml";

/// Widest table Word lays out; larger `gridSpan` values are clamped to it.
const MAX_GRID_SPAN: u32 = 63;

/// DOCX decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxDecoder;

impl Decoder for DocxDecoder {
    fn source_type(&self) -> SourceType {
        SourceType::Docx
    }

    fn decode(&self, data: &[u8], options: &ExtractOptions) -> Result<Extraction> {
        let mut package = open_package(data, options.password.as_deref())?;
        let xml = read_part(&mut package, DOCUMENT)?
            .ok_or_else(|| Error::Corrupt(format!("missing {}", DOCUMENT)))?;

        let (pages, runs) = parse_tables(&xml)?;
        log::trace!("DOCX source: {} tables, {} cells", pages.len(), runs.len());

        Ok(Extraction::new(
            SourceType::Docx,
            pages,
            RunEventStream::from_events(runs),
        ))
    }
}

/// Character properties of a run (`w:rPr`).
#[derive(Debug, Clone, Default)]
struct RunProps {
    font: Option<String>,
    /// In points
    size: Option<f64>,
    bold: bool,
    italic: bool,
    underline: bool,
    color: Option<String>,
}

impl RunProps {
    fn apply(&mut self, e: &BytesStart) {
        match e.local_name().as_ref() {
            b"rFonts" => {
                if self.font.is_none() {
                    self.font = get_attribute(e, "ascii").or_else(|| get_attribute(e, "hAnsi"));
                }
            }
            b"sz" => {
                self.size = get_attribute(e, "val")
                    .and_then(|v| v.parse::<f64>().ok())
                    .map(|half_points| half_points / 2.0);
            }
            b"b" => self.bold = is_on(e),
            b"i" => self.italic = is_on(e),
            b"u" => self.underline = is_on(e),
            b"color" => {
                self.color = get_attribute(e, "val")
                    .filter(|v| v != "auto")
                    .and_then(|v| hex_color(&v));
            }
            _ => {}
        }
    }

    fn to_raw(&self) -> (RawFont, RawStyle) {
        let mut style = RawStyle::new(self.size.unwrap_or(DEFAULT_DOCX_FONT_SIZE))
            .bold(self.bold)
            .italic(self.italic)
            .underline(self.underline);
        if let Some(color) = &self.color {
            style = style.with_color(color.clone());
        }
        let font = RawFont::named(self.font.as_deref().unwrap_or(DEFAULT_DOCX_FONT));
        (font, style)
    }
}

/// Table cell being read.
#[derive(Debug, Default)]
struct CellState {
    span: u32,
    continuation: bool,
    paragraphs: Vec<String>,
    /// Properties of the first run in the cell
    props: Option<RunProps>,
    runs_seen: usize,
}

/// Tables of the document body as pages and runs.
fn parse_tables(xml: &str) -> Result<(Vec<PageGeometry>, Vec<RunEvent>)> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut pages = Vec::new();
    let mut runs = Vec::new();

    let mut table_depth = 0usize;
    let mut row = 0u32;
    let mut col = 0u32;
    let mut max_cols = 0u32;
    let mut cell: Option<CellState> = None;
    let mut in_cell_props = false;
    let mut in_run = false;
    let mut in_run_props = false;
    let mut in_text = false;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.local_name();
                let name = name.as_ref();
                if name == b"tbl" && !empty {
                    table_depth += 1;
                    if table_depth == 1 {
                        row = 0;
                        max_cols = 0;
                    }
                } else if table_depth != 1 {
                    // Nested tables are part of their enclosing cell.
                } else if name == b"tr" && !empty {
                    row = row.saturating_add(1);
                    col = 0;
                } else if name == b"tc" {
                    col = col.saturating_add(1);
                    cell = Some(CellState {
                        span: 1,
                        ..CellState::default()
                    });
                    if empty {
                        finish_cell(cell.take(), pages.len() as u32 + 1, row, &mut col, &mut runs);
                    }
                } else if let Some(state) = cell.as_mut() {
                    match name {
                        b"tcPr" if !empty => in_cell_props = true,
                        b"gridSpan" if in_cell_props => {
                            state.span = get_attribute(e, "val")
                                .and_then(|v| v.parse().ok())
                                .filter(|&span: &u32| span > 0)
                                .map_or(1, |span| span.min(MAX_GRID_SPAN));
                        }
                        b"vMerge" if in_cell_props => {
                            state.continuation = get_attribute(e, "val")
                                .map_or(true, |v| v == "continue");
                        }
                        b"p" => state.paragraphs.push(String::new()),
                        b"r" if !empty => {
                            in_run = true;
                            state.runs_seen += 1;
                            if state.runs_seen == 1 {
                                state.props = Some(RunProps::default());
                            }
                        }
                        b"rPr" if !empty => in_run_props = true,
                        b"t" if !empty => in_text = true,
                        b"tab" if in_run && !in_run_props => {
                            if let Some(p) = state.paragraphs.last_mut() {
                                p.push('\t');
                            }
                        }
                        // Paragraph-mark properties (`w:pPr/w:rPr`) sit outside any run.
                        _ if in_run && in_run_props && state.runs_seen == 1 => {
                            if let Some(props) = state.props.as_mut() {
                                props.apply(e);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::Text(ref e) if in_text && table_depth == 1 => {
                if let Some(p) = cell.as_mut().and_then(|c| c.paragraphs.last_mut()) {
                    p.push_str(&e.unescape()?);
                }
            }
            Event::End(ref e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"tbl" => {
                        if table_depth == 1 {
                            pages.push(PageGeometry::new(max_cols as f64, row as f64));
                        }
                        table_depth = table_depth.saturating_sub(1);
                    }
                    _ if table_depth != 1 => {}
                    b"tr" => max_cols = max_cols.max(col),
                    b"tc" => {
                        finish_cell(cell.take(), pages.len() as u32 + 1, row, &mut col, &mut runs);
                    }
                    b"tcPr" => in_cell_props = false,
                    b"r" => in_run = false,
                    b"rPr" => in_run_props = false,
                    b"t" => in_text = false,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((pages, runs))
}

/// Emit a finished cell, unless it continues a vertical merge.
fn finish_cell(
    cell: Option<CellState>,
    page_index: u32,
    row: u32,
    col: &mut u32,
    runs: &mut Vec<RunEvent>,
) {
    let Some(cell) = cell else {
        return;
    };
    if !cell.continuation {
        let (font, style) = cell.props.unwrap_or_default().to_raw();
        runs.push(RunEvent::new(
            page_index,
            (*col as f64, row as f64, cell.span as f64, 1.0),
            cell.paragraphs.join("\n"),
            font,
            style,
        ));
    }
    *col = col.saturating_add(cell.span - 1);
}
