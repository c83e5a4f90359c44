//! PDF backend using lopdf.
//!
//! The lopdf document lives on a worker thread. Page geometry is reported
//! back as soon as the page tree has been read; runs follow through a bounded
//! queue. Content streams are decoded in parallel per chunk of pages and then
//! interpreted sequentially, so runs always arrive in page order.

use std::collections::{BTreeMap, HashMap};

use lopdf::content::{Content, Operation};
use lopdf::encryption::DecryptionError;
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::model::{rgba, SourceType, BLACK};

use super::backend::{
    decode_text_simple, Decoder, Extraction, PageGeometry, RawFont, RawStyle, RunEvent,
    RunEventStream, RunSink,
};
use super::options::{ErrorMode, ExtractOptions};

/// US Letter, used when a page has no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Pages decoded together before their runs are emitted.
const PAGE_CHUNK: usize = 16;

/// Limit on `Parent` hops when looking up inherited page attributes.
const MAX_INHERIT_DEPTH: usize = 32;

/// Approximate glyph advance as a fraction of the font size.
const ADVANCE_RATIO: f64 = 0.5;

/// Approximate ascent as a fraction of the font size.
const ASCENT_RATIO: f64 = 0.8;

/// FontDescriptor flag bits.
const FLAG_ITALIC: i64 = 1 << 6;
const FLAG_FORCE_BOLD: i64 = 1 << 18;

const FONT_FILE_KEYS: [&[u8]; 3] = [b"FontFile", b"FontFile2", b"FontFile3"];

/// PDF decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfDecoder;

impl Decoder for PdfDecoder {
    fn source_type(&self) -> SourceType {
        SourceType::Pdf
    }

    fn decode(&self, data: &[u8], options: &ExtractOptions) -> Result<Extraction> {
        let bytes = data.to_vec();
        let options = options.clone();
        let capacity = options.channel_capacity;
        let (setup_tx, setup_rx) = crossbeam_channel::bounded::<Result<Vec<PageGeometry>>>(1);

        let runs = RunEventStream::spawn("bboxes-pdf", capacity, move |sink| {
            let setup = load_document(&bytes, options.password.as_deref())
                .and_then(|doc| page_entries(&doc).map(|pages| (doc, pages)));
            let (doc, pages) = match setup {
                Ok(loaded) => loaded,
                Err(e) => {
                    let _ = setup_tx.send(Err(e));
                    return Ok(());
                }
            };

            let geometry = pages.iter().map(|p| p.geometry).collect();
            if setup_tx.send(Ok(geometry)).is_err() {
                return Ok(());
            }
            drop(setup_tx);

            extract_runs(&doc, &pages, &options, sink)
        })?;

        let pages = setup_rx
            .recv()
            .map_err(|_| Error::Corrupt("PDF worker exited before reading the page tree".into()))??;
        log::trace!("PDF source: {} pages", pages.len());

        Ok(Extraction::new(SourceType::Pdf, pages, runs))
    }
}

/// Load and, if needed, decrypt a document.
fn load_document(data: &[u8], password: Option<&str>) -> Result<LopdfDocument> {
    // Reading from memory, so an I/O error means the buffer ended early.
    let mut doc = LopdfDocument::load_mem(data).map_err(|e| match e {
        lopdf::Error::IO(e) => Error::Corrupt(format!("truncated PDF: {}", e)),
        other => Error::from(other),
    })?;
    if doc.is_encrypted() {
        // Owner-password-only documents open with an empty user password.
        if let Err(e) = doc.decrypt(password.unwrap_or("")) {
            return Err(decryption_error(&doc, e, password.is_some()));
        }
        log::debug!("Decrypted PDF");
    }
    Ok(doc)
}

/// Map a failed decryption. Only a rejected password is an auth error.
fn decryption_error(doc: &LopdfDocument, err: lopdf::Error, password_given: bool) -> Error {
    match err {
        lopdf::Error::Decryption(DecryptionError::IncorrectPassword) if password_given => {
            Error::AuthFailed
        }
        lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => Error::AuthRequired,
        lopdf::Error::Decryption(DecryptionError::UnsupportedEncryption) => {
            let (v, r) = encryption_version(doc);
            Error::Unsupported(format!("PDF encryption V={} R={}", v, r))
        }
        lopdf::Error::Decryption(e) => {
            Error::Corrupt(format!("invalid encryption dictionary: {}", e))
        }
        other => Error::from(other),
    }
}

/// `V` and `R` of the encryption dictionary, `0` where absent.
fn encryption_version(doc: &LopdfDocument) -> (i64, i64) {
    let entry = |key: &[u8]| {
        doc.get_encrypted()
            .and_then(|dict| dict.get(key))
            .and_then(Object::as_i64)
            .unwrap_or(0)
    };
    (entry(b"V"), entry(b"R"))
}

/// One page of the page tree.
#[derive(Debug, Clone, Copy)]
struct PageEntry {
    number: u32,
    id: ObjectId,
    geometry: PageGeometry,
    /// Left edge of the MediaBox in user space
    left: f64,
    /// Top edge of the MediaBox in user space
    top: f64,
}

fn page_entries(doc: &LopdfDocument) -> Result<Vec<PageEntry>> {
    let mut entries = Vec::new();
    for (index, (_, id)) in doc.get_pages().into_iter().enumerate() {
        let [x0, y0, x1, y1] = media_box(doc, id).unwrap_or(DEFAULT_MEDIA_BOX);
        entries.push(PageEntry {
            number: index as u32 + 1,
            id,
            geometry: PageGeometry::new((x1 - x0).abs(), (y1 - y0).abs()),
            left: x0.min(x1),
            top: y0.max(y1),
        });
    }
    Ok(entries)
}

/// MediaBox of a page, following `Parent` links for inherited values.
fn media_box(doc: &LopdfDocument, page_id: ObjectId) -> Option<[f64; 4]> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(obj) = current.get(b"MediaBox") {
            if let Ok(array) = resolve(doc, obj).as_array() {
                let values: Vec<f64> = array
                    .iter()
                    .filter_map(|o| get_number(resolve(doc, o)))
                    .collect();
                if let [x0, y0, x1, y1] = values[..] {
                    return Some([x0, y0, x1, y1]);
                }
            }
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn extract_runs(
    doc: &LopdfDocument,
    pages: &[PageEntry],
    options: &ExtractOptions,
    sink: &RunSink,
) -> Result<()> {
    let selected: Vec<&PageEntry> = pages
        .iter()
        .filter(|p| options.pages.includes(p.number))
        .collect();

    for chunk in selected.chunks(PAGE_CHUNK) {
        let raw: Vec<Result<Vec<u8>>> = chunk.iter().map(|p| page_content(doc, p.id)).collect();
        let decoded: Vec<Result<Content>> = if options.parallel {
            raw.into_par_iter().map(decode_content).collect()
        } else {
            raw.into_iter().map(decode_content).collect()
        };

        for (page, content) in chunk.iter().zip(decoded) {
            let runs = content.and_then(|content| {
                let mut interpreter = PageInterpreter::new(doc, page)?;
                interpreter.run(&content.operations);
                Ok(interpreter.runs)
            });

            let runs = match runs {
                Ok(runs) => runs,
                Err(e) => match options.error_mode {
                    ErrorMode::Strict => {
                        return Err(Error::Corrupt(format!("page {}: {}", page.number, e)));
                    }
                    ErrorMode::Lenient => {
                        log::warn!("Skipping page {}: {}", page.number, e);
                        continue;
                    }
                },
            };

            log::trace!("Page {}: {} runs", page.number, runs.len());
            for run in runs {
                if !sink.emit(run) {
                    log::debug!("Run consumer went away, stopping PDF worker");
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

fn decode_content(raw: Result<Vec<u8>>) -> Result<Content> {
    let raw = raw?;
    Ok(Content::decode(&raw)?)
}

/// Concatenated content stream of a page. A page without contents is empty.
fn page_content(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc.get_dictionary(page_id)?;
    let contents = match page_dict.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    match resolve(doc, contents) {
        Object::Stream(s) => Ok(stream_bytes(s)),
        Object::Array(arr) => {
            let mut content = Vec::new();
            for obj in arr {
                if let Object::Stream(s) = resolve(doc, obj) {
                    content.extend_from_slice(&stream_bytes(s));
                    content.push(b' ');
                }
            }
            Ok(content)
        }
        _ => Err(Error::Corrupt("invalid content stream".to_string())),
    }
}

/// Stream data, decompressed when the stream has filters.
fn stream_bytes(stream: &lopdf::Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

/// Font as used by the interpreter.
#[derive(Debug, Clone)]
struct FontFace {
    raw: RawFont,
    bold: bool,
    italic: bool,
}

fn describe_font(doc: &LopdfDocument, font: &Dictionary) -> FontFace {
    let name = font
        .get(b"BaseFont")
        .and_then(Object::as_name)
        .map(|n| String::from_utf8_lossy(n).to_string())
        .unwrap_or_else(|_| "Unknown".to_string());

    let descriptor = font_descriptor(doc, font);
    let flags = descriptor
        .and_then(|d| d.get(b"Flags").ok())
        .and_then(|o| resolve(doc, o).as_i64().ok())
        .unwrap_or(0);
    let fingerprint = descriptor.and_then(|d| {
        FONT_FILE_KEYS
            .iter()
            .find_map(|key| d.get(key).and_then(Object::as_reference).ok())
    });

    let lower = name.to_ascii_lowercase();
    let bold = flags & FLAG_FORCE_BOLD != 0
        || lower.contains("bold")
        || lower.contains("black")
        || lower.contains("heavy");
    let italic = flags & FLAG_ITALIC != 0 || lower.contains("italic") || lower.contains("oblique");

    let mut raw = RawFont::named(name);
    if let Some((num, gen)) = fingerprint {
        raw = raw.with_fingerprint(format!("{} {} R", num, gen));
    }
    FontFace { raw, bold, italic }
}

/// FontDescriptor of a simple font, or of the first descendant of a Type0 font.
fn font_descriptor<'a>(doc: &'a LopdfDocument, font: &'a Dictionary) -> Option<&'a Dictionary> {
    if let Ok(obj) = font.get(b"FontDescriptor") {
        return resolve(doc, obj).as_dict().ok();
    }
    let descendants = resolve(doc, font.get(b"DescendantFonts").ok()?)
        .as_array()
        .ok()?;
    let first = resolve(doc, descendants.first()?).as_dict().ok()?;
    resolve(doc, first.get(b"FontDescriptor").ok()?).as_dict().ok()
}

/// Content stream interpreter for one page.
struct PageInterpreter<'a> {
    doc: &'a LopdfDocument,
    page: &'a PageEntry,
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    faces: HashMap<Vec<u8>, FontFace>,
    runs: Vec<RunEvent>,

    fill: String,
    saved_fill: Vec<String>,

    in_text: bool,
    matrix: TextMatrix,
    line_matrix: TextMatrix,
    font: Vec<u8>,
    font_size: f64,
    leading: f64,
}

impl<'a> PageInterpreter<'a> {
    fn new(doc: &'a LopdfDocument, page: &'a PageEntry) -> Result<Self> {
        let fonts = doc.get_page_fonts(page.id)?;
        Ok(Self {
            doc,
            page,
            fonts,
            faces: HashMap::new(),
            runs: Vec::new(),
            fill: BLACK.to_string(),
            saved_fill: Vec::new(),
            in_text: false,
            matrix: TextMatrix::default(),
            line_matrix: TextMatrix::default(),
            font: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
        })
    }

    fn run(&mut self, operations: &[Operation]) {
        for op in operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => self.saved_fill.push(self.fill.clone()),
                "Q" => {
                    if let Some(fill) = self.saved_fill.pop() {
                        self.fill = fill;
                    }
                }
                "g" | "rg" | "k" | "sc" | "scn" => {
                    let components: Vec<f64> = operands.iter().filter_map(get_number).collect();
                    if let Some(color) = fill_color(&components) {
                        self.fill = color;
                    }
                }
                "BT" => {
                    self.in_text = true;
                    self.matrix = TextMatrix::default();
                    self.line_matrix = TextMatrix::default();
                }
                "ET" => self.in_text = false,
                "Tf" => {
                    if let [Object::Name(name), size, ..] = &operands[..] {
                        self.font = name.clone();
                        self.font_size = get_number(size).unwrap_or(12.0);
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(get_number) {
                        self.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    let tx = operands.first().and_then(get_number).unwrap_or(0.0);
                    let ty = operands.get(1).and_then(get_number).unwrap_or(0.0);
                    if op.operator == "TD" {
                        self.leading = -ty;
                    }
                    self.line_matrix = self.line_matrix.translate(tx, ty);
                    self.matrix = self.line_matrix;
                }
                "Tm" => {
                    let values: Vec<f64> = operands.iter().filter_map(get_number).collect();
                    if let [a, b, c, d, e, f] = values[..] {
                        self.line_matrix = TextMatrix { a, b, c, d, e, f };
                        self.matrix = self.line_matrix;
                    }
                }
                "T*" => self.next_line(),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let text = self.decode(bytes);
                        self.show(text, 0.0);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        self.show_array(items);
                    }
                }
                "'" | "\"" => {
                    self.next_line();
                    let text_idx = if op.operator == "\"" { 2 } else { 0 };
                    if let Some(Object::String(bytes, _)) = operands.get(text_idx) {
                        let text = self.decode(bytes);
                        self.show(text, 0.0);
                    }
                }
                _ => {}
            }
        }
    }

    fn next_line(&mut self) {
        self.line_matrix = self.line_matrix.translate(0.0, -self.leading);
        self.matrix = self.line_matrix;
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let encoding = self
            .fonts
            .get(&self.font)
            .and_then(|f| f.get_font_encoding(self.doc).ok());
        match encoding {
            Some(enc) => LopdfDocument::decode_text(&enc, bytes)
                .unwrap_or_else(|_| decode_text_simple(bytes)),
            None => decode_text_simple(bytes),
        }
    }

    /// TJ: strings and positioning adjustments in thousandths of text space.
    fn show_array(&mut self, items: &[Object]) {
        let mut combined = String::new();
        let mut adjust = 0.0;
        for item in items {
            match item {
                Object::String(bytes, _) => combined.push_str(&self.decode(bytes)),
                other => {
                    if let Some(n) = get_number(other) {
                        adjust -= n / 1000.0 * self.font_size;
                    }
                }
            }
        }
        self.show(combined, adjust);
    }

    /// Emit one run at the current text position and advance past it.
    fn show(&mut self, text: String, adjust: f64) {
        let glyphs = text.chars().count() as f64;
        let advance = (ADVANCE_RATIO * self.font_size.abs() * glyphs + adjust).max(0.0);

        if self.in_text && !text.trim().is_empty() {
            let size = self.font_size.abs() * self.matrix.vertical_scale();
            let width = advance * self.matrix.horizontal_scale();
            let x = self.matrix.e - self.page.left;
            let y = self.page.top - (self.matrix.f + ASCENT_RATIO * size);

            let face = self.face();
            let style = RawStyle::new(size)
                .with_color(self.fill.clone())
                .bold(face.bold)
                .italic(face.italic);
            self.runs.push(RunEvent::new(
                self.page.number,
                (x, y, width, size),
                text,
                face.raw,
                style,
            ));
        }

        self.matrix = self.matrix.translate(advance, 0.0);
    }

    fn face(&mut self) -> FontFace {
        if let Some(face) = self.faces.get(&self.font) {
            return face.clone();
        }
        let face = match self.fonts.get(&self.font) {
            Some(dict) => describe_font(self.doc, dict),
            None => FontFace {
                raw: RawFont::named(String::from_utf8_lossy(&self.font).to_string()),
                bold: false,
                italic: false,
            },
        };
        self.faces.insert(self.font.clone(), face.clone());
        face
    }
}

/// Fill colour from DeviceGray, DeviceRGB or DeviceCMYK components.
fn fill_color(components: &[f64]) -> Option<String> {
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    match *components {
        [gray] => Some(rgba(channel(gray), channel(gray), channel(gray), 255)),
        [r, g, b] => Some(rgba(channel(r), channel(g), channel(b), 255)),
        [c, m, y, k] => Some(rgba(
            channel((1.0 - c) * (1.0 - k)),
            channel((1.0 - m) * (1.0 - k)),
            channel((1.0 - y) * (1.0 - k)),
            255,
        )),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct TextMatrix {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64, // X translation
    f: f64, // Y translation
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl TextMatrix {
    fn translate(self, tx: f64, ty: f64) -> Self {
        Self {
            e: self.e + tx * self.a + ty * self.c,
            f: self.f + tx * self.b + ty * self.d,
            ..self
        }
    }

    fn horizontal_scale(&self) -> f64 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn vertical_scale(&self) -> f64 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Follow a reference, returning the object itself if it is not one.
fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Helper to extract number from PDF object.
fn get_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}
