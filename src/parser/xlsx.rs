//! Spreadsheet (XLSX) backend.
//!
//! Each worksheet is a page whose width and height are the highest used
//! column and row. Every non-empty cell becomes one run at `(col, row, 1, 1)`;
//! cells hidden under a merged range are skipped.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::model::{hex_color, SourceType};

use super::backend::{
    Decoder, Extraction, PageGeometry, RawFont, RawStyle, RunEvent, RunEventStream,
};
use super::ooxml::{
    column_name, get_attribute, is_on, open_package, parse_cell_ref, parse_range, read_part,
    Package,
};
use super::options::ExtractOptions;

/// Font name for cells without an applied font.
pub const DEFAULT_CELL_FONT: &str = "default";

/// Font size for cells without an applied font.
pub const DEFAULT_CELL_FONT_SIZE: f64 = 11.0;

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const STYLES: &str = "xl/styles.xml";

/// XLSX decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxDecoder;

impl Decoder for XlsxDecoder {
    fn source_type(&self) -> SourceType {
        SourceType::Xlsx
    }

    fn decode(&self, data: &[u8], options: &ExtractOptions) -> Result<Extraction> {
        let mut package = open_package(data, options.password.as_deref())?;

        let sheets = sheet_parts(&mut package)?;
        let shared = match read_part(&mut package, SHARED_STRINGS)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };
        let styles = match read_part(&mut package, STYLES)? {
            Some(xml) => parse_styles(&xml)?,
            None => StyleSheet::default(),
        };

        let mut pages = Vec::with_capacity(sheets.len());
        let mut runs = Vec::new();
        for (index, part) in sheets.iter().enumerate() {
            let xml = read_part(&mut package, part)?
                .ok_or_else(|| Error::Corrupt(format!("missing worksheet part {}", part)))?;
            let sheet = parse_sheet(&xml)?;
            let page_index = index as u32 + 1;

            pages.push(PageGeometry::new(sheet.max_col as f64, sheet.max_row as f64));
            let before = runs.len();
            sheet.emit(page_index, &shared, &styles, &mut runs);
            log::trace!("Sheet {} ({}): {} cells", page_index, part, runs.len() - before);
        }

        Ok(Extraction::new(
            SourceType::Xlsx,
            pages,
            RunEventStream::from_events(runs),
        ))
    }
}

/// Worksheet part names in workbook order.
fn sheet_parts(package: &mut Package<'_>) -> Result<Vec<String>> {
    let workbook = read_part(package, WORKBOOK)?
        .ok_or_else(|| Error::Corrupt(format!("missing {}", WORKBOOK)))?;
    let targets = match read_part(package, WORKBOOK_RELS)? {
        Some(xml) => parse_relationships(&xml)?,
        None => Vec::new(),
    };

    let mut reader = Reader::from_str(&workbook);
    let mut buf = Vec::new();
    let mut parts = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                let target = get_attribute(e, "id").and_then(|id| {
                    targets
                        .iter()
                        .find(|(rel_id, _)| *rel_id == id)
                        .map(|(_, target)| resolve_target(target))
                });
                // Without relationships, fall back to the conventional part name.
                let part = target
                    .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", parts.len() + 1));
                parts.push(part);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(parts)
}

/// `(Id, Target)` pairs of a relationships part.
fn parse_relationships(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut rels = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) =
                    (get_attribute(e, "Id"), get_attribute(e, "Target"))
                {
                    rels.push((id, target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

/// Shared string table. Rich-text runs are concatenated; phonetic hints dropped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_phonetic = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"rPh" => in_phonetic = true,
                b"t" => in_text = !in_phonetic,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(ref e) if in_text => current.push_str(&e.unescape()?),
            Event::CData(e) if in_text => {
                current.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Font record from `styles.xml`.
#[derive(Debug, Clone, PartialEq)]
struct CellFont {
    name: Option<String>,
    size: Option<f64>,
    bold: bool,
    italic: bool,
    underline: bool,
    color: Option<String>,
}

impl CellFont {
    fn empty() -> Self {
        Self {
            name: None,
            size: None,
            bold: false,
            italic: false,
            underline: false,
            color: None,
        }
    }

    fn apply(&mut self, e: &BytesStart) {
        match e.local_name().as_ref() {
            b"b" => self.bold = is_on(e),
            b"i" => self.italic = is_on(e),
            b"u" => self.underline = is_on(e),
            b"sz" => self.size = get_attribute(e, "val").and_then(|v| v.parse().ok()),
            b"name" => self.name = get_attribute(e, "val"),
            // Theme and indexed colours are left at the default.
            b"color" => self.color = get_attribute(e, "rgb").and_then(|v| hex_color(&v)),
            _ => {}
        }
    }
}

/// The parts of `styles.xml` needed to style a cell.
#[derive(Debug, Clone, Default)]
struct StyleSheet {
    fonts: Vec<CellFont>,
    /// Font index per cell format (`cellXfs`)
    cell_formats: Vec<Option<usize>>,
}

impl StyleSheet {
    fn font_for(&self, format: Option<usize>) -> Option<&CellFont> {
        let font = (*self.cell_formats.get(format?)?)?;
        self.fonts.get(font)
    }
}

fn parse_styles(xml: &str) -> Result<StyleSheet> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut sheet = StyleSheet::default();
    let mut in_fonts = false;
    let mut in_cell_formats = false;
    let mut font: Option<CellFont> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"fonts" => in_fonts = true,
                b"cellXfs" => in_cell_formats = true,
                b"font" if in_fonts => font = Some(CellFont::empty()),
                b"xf" if in_cell_formats => sheet.cell_formats.push(font_id(e)),
                _ => {
                    if let Some(font) = font.as_mut() {
                        font.apply(e);
                    }
                }
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"font" if in_fonts => sheet.fonts.push(CellFont::empty()),
                b"xf" if in_cell_formats => sheet.cell_formats.push(font_id(e)),
                _ => {
                    if let Some(font) = font.as_mut() {
                        font.apply(e);
                    }
                }
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"fonts" => in_fonts = false,
                b"cellXfs" => in_cell_formats = false,
                b"font" => {
                    if let Some(done) = font.take() {
                        sheet.fonts.push(done);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheet)
}

fn font_id(e: &BytesStart) -> Option<usize> {
    get_attribute(e, "fontId").and_then(|v| v.parse().ok())
}

/// One `<c>` element.
#[derive(Debug, Clone, Default)]
struct RawCell {
    col: u32,
    row: u32,
    kind: Option<String>,
    format: Option<usize>,
    value: String,
    inline: String,
    formula: Option<String>,
    /// Shared formula group (`si`) this cell belongs to
    shared_formula: Option<u32>,
}

impl RawCell {
    fn text(&self, shared: &[String]) -> String {
        match self.kind.as_deref() {
            Some("s") => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i))
                .cloned()
                .unwrap_or_default(),
            Some("inlineStr") => self.inline.clone(),
            Some("b") => match self.value.trim() {
                "" => String::new(),
                "1" | "true" => "TRUE".to_string(),
                _ => "FALSE".to_string(),
            },
            _ => self.value.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Capture {
    Value,
    Formula,
    Inline,
}

#[derive(Debug, Default)]
struct Sheet {
    cells: Vec<RawCell>,
    merges: Vec<((u32, u32), (u32, u32))>,
    /// Master cell `(col, row)` and text of each shared formula group
    shared_formulas: HashMap<u32, (u32, u32, String)>,
    max_col: u32,
    max_row: u32,
}

impl Sheet {
    /// Whether `(col, row)` lies under a merged range but is not its origin.
    fn is_covered(&self, col: u32, row: u32) -> bool {
        self.merges.iter().any(|&((c0, r0), (c1, r1))| {
            (c0..=c1).contains(&col) && (r0..=r1).contains(&row) && (col, row) != (c0, r0)
        })
    }

    /// Formula of a cell. Shared formula followers take their master's text
    /// with relative references moved by the offset between the cells.
    fn formula_of(&self, cell: &RawCell) -> Option<String> {
        if let Some(formula) = cell.formula.as_deref().filter(|f| !f.is_empty()) {
            return Some(formula.to_string());
        }
        let (col, row, master) = self.shared_formulas.get(&cell.shared_formula?)?;
        Some(shift_references(
            master,
            i64::from(cell.col) - i64::from(*col),
            i64::from(cell.row) - i64::from(*row),
        ))
    }

    fn emit(
        &self,
        page_index: u32,
        shared: &[String],
        styles: &StyleSheet,
        out: &mut Vec<RunEvent>,
    ) {
        let mut cells: Vec<&RawCell> = self.cells.iter().collect();
        cells.sort_by_key(|c| (c.row, c.col));

        for cell in cells {
            if self.is_covered(cell.col, cell.row) {
                continue;
            }
            let text = cell.text(shared);
            let formula = self.formula_of(cell);
            if text.is_empty() && formula.is_none() {
                continue;
            }

            let (font, style) = cell_style(styles.font_for(cell.format));
            let mut run = RunEvent::new(
                page_index,
                (cell.col as f64, cell.row as f64, 1.0, 1.0),
                text,
                font,
                style,
            );
            if let Some(formula) = formula {
                run = run.with_formula(format!("={}", formula));
            }
            out.push(run);
        }
    }
}

fn cell_style(font: Option<&CellFont>) -> (RawFont, RawStyle) {
    let Some(font) = font else {
        return (
            RawFont::named(DEFAULT_CELL_FONT),
            RawStyle::new(DEFAULT_CELL_FONT_SIZE),
        );
    };
    let mut style = RawStyle::new(font.size.unwrap_or(DEFAULT_CELL_FONT_SIZE))
        .bold(font.bold)
        .italic(font.italic)
        .underline(font.underline);
    if let Some(color) = &font.color {
        style = style.with_color(color.clone());
    }
    let name = font.name.as_deref().unwrap_or(DEFAULT_CELL_FONT);
    (RawFont::named(name), style)
}

fn parse_sheet(xml: &str) -> Result<Sheet> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut sheet = Sheet::default();

    let mut row = 0u32;
    let mut col = 0u32;
    let mut cell: Option<RawCell> = None;
    let mut capture: Option<Capture> = None;
    let mut in_inline = false;
    let mut in_phonetic = false;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    row = get_attribute(e, "r")
                        .and_then(|r| r.parse().ok())
                        .unwrap_or(row + 1);
                    col = 0;
                }
                b"c" => {
                    let (c, r) = get_attribute(e, "r")
                        .and_then(|r| parse_cell_ref(&r))
                        .unwrap_or((col + 1, row.max(1)));
                    col = c;
                    let new_cell = RawCell {
                        col: c,
                        row: r,
                        kind: get_attribute(e, "t"),
                        format: get_attribute(e, "s").and_then(|s| s.parse().ok()),
                        ..RawCell::default()
                    };
                    if empty {
                        sheet.push_cell(new_cell);
                    } else {
                        cell = Some(new_cell);
                    }
                }
                b"v" if !empty => capture = Some(Capture::Value),
                b"f" => {
                    if let Some(cell) = cell.as_mut() {
                        if get_attribute(e, "t").as_deref() == Some("shared") {
                            cell.shared_formula =
                                get_attribute(e, "si").and_then(|s| s.parse().ok());
                        }
                        if !empty {
                            cell.formula.get_or_insert_with(String::new);
                        }
                    }
                    if !empty {
                        capture = Some(Capture::Formula);
                    }
                }
                b"is" if !empty => in_inline = true,
                b"rPh" if !empty => in_phonetic = true,
                b"t" if !empty && in_inline && !in_phonetic => capture = Some(Capture::Inline),
                b"mergeCell" => {
                    if let Some(range) = get_attribute(e, "ref").and_then(|r| parse_range(&r)) {
                        sheet.merges.push(range);
                    }
                }
                _ => {}
            },
            Event::Text(ref e) => {
                if let (Some(target), Some(cell)) = (capture, cell.as_mut()) {
                    let text = e.unescape()?;
                    match target {
                        Capture::Value => cell.value.push_str(&text),
                        Capture::Formula => {
                            cell.formula.get_or_insert_with(String::new).push_str(&text)
                        }
                        Capture::Inline => cell.inline.push_str(&text),
                    }
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some(done) = cell.take() {
                        sheet.push_cell(done);
                    }
                }
                b"v" | b"f" | b"t" => capture = None,
                b"is" => in_inline = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheet)
}

impl Sheet {
    fn push_cell(&mut self, cell: RawCell) {
        self.max_col = self.max_col.max(cell.col);
        self.max_row = self.max_row.max(cell.row);
        if let (Some(si), Some(formula)) = (cell.shared_formula, cell.formula.as_ref()) {
            if !formula.is_empty() {
                self.shared_formulas
                    .entry(si)
                    .or_insert_with(|| (cell.col, cell.row, formula.clone()));
            }
        }
        self.cells.push(cell);
    }
}

/// Move the relative A1 references of `formula` by `d_col` columns and
/// `d_row` rows. `$`-anchored parts stay put; references pushed off the
/// sheet become `#REF!`.
fn shift_references(formula: &str, d_col: i64, d_row: i64) -> String {
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len());
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let starts_token = !in_string
            && (b == b'$' || b.is_ascii_alphabetic())
            && (i == 0 || !is_name_byte(bytes[i - 1]));
        if starts_token {
            if let Some((len, shifted)) = shift_reference_at(&bytes[i..], d_col, d_row) {
                out.push_str(&shifted);
                i += len;
            } else {
                // Function or defined name: copy it whole.
                let len = bytes[i..].iter().take_while(|&&b| is_name_byte(b)).count().max(1);
                out.push_str(&formula[i..i + len]);
                i += len;
            }
            continue;
        }
        if b == b'"' {
            in_string = !in_string;
        }
        let Some(ch) = formula[i..].chars().next() else {
            break;
        };
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'$')
}

/// Parse `$?COL$?ROW` at the start of `s` and return its length and the
/// shifted text.
fn shift_reference_at(s: &[u8], d_col: i64, d_row: i64) -> Option<(usize, String)> {
    let mut i = 0;
    let col_fixed = s.first() == Some(&b'$');
    i += usize::from(col_fixed);
    let letters = s[i..].iter().take_while(|b| b.is_ascii_uppercase()).count();
    if !(1..=3).contains(&letters) {
        return None;
    }
    let col = s[i..i + letters]
        .iter()
        .fold(0i64, |acc, &b| acc * 26 + i64::from(b - b'A' + 1));
    i += letters;

    let row_fixed = s.get(i) == Some(&b'$');
    i += usize::from(row_fixed);
    let digits = s[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || digits > 7 {
        return None;
    }
    let row: i64 = std::str::from_utf8(&s[i..i + digits]).ok()?.parse().ok()?;
    i += digits;
    if s.get(i).is_some_and(|&b| is_name_byte(b) || b == b'(') {
        return None;
    }

    let col = if col_fixed { col } else { col + d_col };
    let row = if row_fixed { row } else { row + d_row };
    let (Ok(col), Ok(row)) = (u32::try_from(col), u32::try_from(row)) else {
        return Some((i, "#REF!".to_string()));
    };
    if col == 0 || row == 0 {
        return Some((i, "#REF!".to_string()));
    }

    let shifted = format!(
        "{}{}{}{}",
        if col_fixed { "$" } else { "" },
        column_name(col),
        if row_fixed { "$" } else { "" },
        row
    );
    Some((i, shifted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ooxml::build_package;

    const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Second" sheetId="2" r:id="rId2"/>
    <sheet name="First" sheetId="1" r:id="rId1"/>
  </sheets>
</workbook>"#;

    const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

    const SHARED_XML: &str = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <si><t>Name</t></si>
  <si><r><t>Rich </t></r><r><t>text</t></r><rPh><t>ignored</t></rPh></si>
  <si/>
</sst>"#;

    const STYLES_XML: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><i/><u/><sz val="14"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  </fonts>
  <cellStyleXfs count="1"><xf fontId="1"/></cellStyleXfs>
  <cellXfs count="2"><xf fontId="0"/><xf fontId="1"/></cellXfs>
  <dxfs count="1"><dxf><font><b/></font></dxf></dxfs>
</styleSheet>"#;

    const SHEET1_XML: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1">
      <c r="A1" t="s" s="1"><v>0</v></c>
      <c r="B1" t="s"><v>1</v></c>
      <c r="C1" s="1"/>
    </row>
    <row r="2">
      <c r="A2"><v>3.5</v></c>
      <c r="B2"><f>SUM(A2:A3)</f><v>7</v></c>
      <c r="C2" t="b"><v>1</v></c>
    </row>
    <row r="3">
      <c r="A3" t="inlineStr"><is><t>inline</t></is></c>
      <c r="B3" t="s"><v>2</v></c>
    </row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A3:B4"/></mergeCells>
</worksheet>"#;

    const SHEET2_XML: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>second</t></is></c></row></sheetData>
</worksheet>"#;

    fn workbook() -> Vec<u8> {
        build_package(&[
            ("[Content_Types].xml", "<Types/>"),
            ("xl/workbook.xml", WORKBOOK_XML),
            ("xl/_rels/workbook.xml.rels", RELS_XML),
            ("xl/sharedStrings.xml", SHARED_XML),
            ("xl/styles.xml", STYLES_XML),
            ("xl/worksheets/sheet1.xml", SHEET1_XML),
            ("xl/worksheets/sheet2.xml", SHEET2_XML),
        ])
    }

    fn decode(data: &[u8]) -> (Vec<PageGeometry>, Vec<RunEvent>) {
        let extraction = XlsxDecoder.decode(data, &ExtractOptions::default()).unwrap();
        let runs = extraction.runs.map(|r| r.unwrap()).collect();
        (extraction.pages, runs)
    }

    #[test]
    fn test_sheets_in_workbook_order() {
        let (pages, runs) = decode(&workbook());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], PageGeometry::new(1.0, 1.0));
        assert_eq!(pages[1], PageGeometry::new(3.0, 3.0));
        assert_eq!(runs[0].text, "second");
        assert_eq!(runs[0].page_index, 1);
    }

    #[test]
    fn test_cell_values_and_geometry() {
        let (_, runs) = decode(&workbook());
        let texts: Vec<&str> = runs[1..].iter().map(|r| r.text.as_str()).collect();
        // C1 has no value, B3 is covered by the A3:B4 merge.
        assert_eq!(texts, vec!["Name", "Rich text", "3.5", "7", "TRUE", "inline"]);

        let b2 = &runs[4];
        assert_eq!((b2.x, b2.y, b2.w, b2.h), (2.0, 2.0, 1.0, 1.0));
        assert_eq!(b2.formula.as_deref(), Some("=SUM(A2:A3)"));
        assert_eq!(runs[3].formula, None);
    }

    #[test]
    fn test_cell_fonts() {
        let (_, runs) = decode(&workbook());
        let a1 = &runs[1];
        assert_eq!(a1.font.name, "Arial");
        assert_eq!(a1.style.font_size, 14.0);
        assert_eq!(a1.style.weight, "bold");
        assert!(a1.style.italic);
        assert!(a1.style.underline);
        assert_eq!(a1.style.color, "rgba(255,0,0,255)");

        // No format: default font.
        let b1 = &runs[2];
        assert_eq!(b1.font.name, DEFAULT_CELL_FONT);
        assert_eq!(b1.style.font_size, DEFAULT_CELL_FONT_SIZE);
        assert_eq!(b1.style.weight, "normal");
    }

    #[test]
    fn test_fallback_sheet_names_without_rels() {
        let data = build_package(&[
            (
                "xl/workbook.xml",
                r#"<workbook><sheets><sheet name="S" sheetId="1" r:id="rId9"/></sheets></workbook>"#,
            ),
            ("xl/worksheets/sheet1.xml", SHEET2_XML),
        ]);
        let (pages, runs) = decode(&data);
        assert_eq!(pages.len(), 1);
        assert_eq!(runs[0].text, "second");
        assert_eq!(runs[0].font.name, DEFAULT_CELL_FONT);
    }

    #[test]
    fn test_missing_workbook_is_corrupt() {
        let data = build_package(&[("word/document.xml", "<w:document/>")]);
        let err = XlsxDecoder
            .decode(&data, &ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)));
    }

    #[test]
    fn test_shared_formula_followers() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1"><v>1</v></c><c r="B1"><f t="shared" ref="B1:B3" si="0">A1*2+$A$1</f><v>3</v></c></row>
            <row r="2"><c r="A2"><v>2</v></c><c r="B2"><f t="shared" si="0"/><v>5</v></c></row>
            <row r="3"><c r="A3"><v>3</v></c><c r="B3"><f t="shared" si="0"/><v>7</v></c></row>
            <row r="4"><c r="C4"><f t="shared" si="9"/><v>0</v></c></row>
        </sheetData></worksheet>"#;
        let data = build_package(&[
            (
                "xl/workbook.xml",
                r#"<workbook><sheets><sheet name="S" sheetId="1"/></sheets></workbook>"#,
            ),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let (_, runs) = decode(&data);

        let formulas: Vec<(&str, Option<&str>)> = runs
            .iter()
            .filter(|r| r.x == 2.0 || r.x == 3.0)
            .map(|r| (r.text.as_str(), r.formula.as_deref()))
            .collect();
        assert_eq!(
            formulas,
            vec![
                ("3", Some("=A1*2+$A$1")),
                ("5", Some("=A2*2+$A$1")),
                ("7", Some("=A3*2+$A$1")),
                // Unknown group: the value stays, the formula is dropped.
                ("0", None),
            ]
        );
    }

    #[test]
    fn test_shift_references() {
        assert_eq!(shift_references("SUM(A1:B2)", 1, 2), "SUM(B3:C4)");
        assert_eq!(shift_references("$A1+A$1+$A$1", 1, 1), "$A2+B$1+$A$1");
        assert_eq!(shift_references("LOG10(A1)&\"B2\"", 0, 1), "LOG10(A2)&\"B2\"");
        assert_eq!(shift_references("Sheet2!Z9", 1, 0), "Sheet2!AA9");
        assert_eq!(shift_references("A1-1", -1, 0), "#REF!-1");
    }

    #[test]
    fn test_shared_strings() {
        let strings = parse_shared_strings(SHARED_XML).unwrap();
        assert_eq!(strings, vec!["Name", "Rich text", ""]);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("/xl/worksheets/a.xml"), "xl/worksheets/a.xml");
    }
}
