//! Backend abstraction layer.
//!
//! A backend turns source bytes into page geometry plus an ordered stream of
//! raw run events. Everything downstream (interning, id assignment, output)
//! is format-agnostic and only sees the types defined here.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::error::{Error, Result};
use crate::model::SourceType;

use super::options::ExtractOptions;

/// Width and height of one page as reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Font descriptor as seen by the backend, before interning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawFont {
    /// Font name (e.g., "ABCDEF+Helvetica-Bold", "Calibri")
    pub name: String,
    /// Identity of the embedded font program, where the format exposes one
    pub fingerprint: Option<String>,
}

impl RawFont {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }
}

/// Rendering attributes as seen by the backend, before interning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStyle {
    pub font_size: f64,
    /// `rgba(r,g,b,a)`
    pub color: String,
    /// `"normal"` or `"bold"`
    pub weight: String,
    pub italic: bool,
    pub underline: bool,
}

impl RawStyle {
    pub fn new(font_size: f64) -> Self {
        Self {
            font_size,
            color: crate::model::BLACK.to_string(),
            weight: crate::model::weight_name(false).to_string(),
            italic: false,
            underline: false,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.weight = crate::model::weight_name(bold).to_string();
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }
}

/// One raw glyph run, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEvent {
    /// 1-based page index
    pub page_index: u32,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub text: String,
    pub font: RawFont,
    pub style: RawStyle,
    /// Spreadsheet formula, if the run is a formula cell
    pub formula: Option<String>,
}

impl RunEvent {
    /// Create a run on `page_index` with the given box and text.
    pub fn new(
        page_index: u32,
        (x, y, w, h): (f64, f64, f64, f64),
        text: impl Into<String>,
        font: RawFont,
        style: RawStyle,
    ) -> Self {
        Self {
            page_index,
            x,
            y,
            w,
            h,
            text: text.into(),
            font,
            style,
            formula: None,
        }
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }
}

/// What a backend produces for one document.
pub struct Extraction {
    pub source_type: SourceType,
    /// One entry per page, in page order
    pub pages: Vec<PageGeometry>,
    pub runs: RunEventStream,
}

impl Extraction {
    pub fn new(source_type: SourceType, pages: Vec<PageGeometry>, runs: RunEventStream) -> Self {
        Self {
            source_type,
            pages,
            runs,
        }
    }
}

impl std::fmt::Debug for Extraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extraction")
            .field("source_type", &self.source_type)
            .field("pages", &self.pages.len())
            .finish_non_exhaustive()
    }
}

/// Format decoder: source bytes in, page geometry and run stream out.
///
/// The built-in formats are dispatched through [`SourceType`]; implement this
/// trait to feed a [`Cursor`](crate::Cursor) from another source.
pub trait Decoder {
    /// Source type recorded on the document row.
    fn source_type(&self) -> SourceType;

    /// Decode `data`. Fails with `AuthRequired`/`AuthFailed`, `Corrupt` or
    /// `Unsupported`; never returns a partial extraction.
    fn decode(&self, data: &[u8], options: &ExtractOptions) -> Result<Extraction>;
}

/// Ordered stream of run events.
///
/// Either fully buffered, or fed by a worker thread through a bounded queue.
/// In the latter case the worker blocks when the queue is full, and dropping
/// the stream disconnects the queue and joins the worker.
pub struct RunEventStream {
    inner: StreamInner,
}

enum StreamInner {
    Buffered(std::vec::IntoIter<RunEvent>),
    Channel {
        rx: Option<Receiver<Result<RunEvent>>>,
        worker: Option<JoinHandle<()>>,
    },
    Closed,
}

impl RunEventStream {
    /// A stream over already-decoded events.
    pub fn from_events(events: Vec<RunEvent>) -> Self {
        Self {
            inner: StreamInner::Buffered(events.into_iter()),
        }
    }

    /// A stream with no events.
    pub fn empty() -> Self {
        Self::from_events(Vec::new())
    }

    /// Run `producer` on a named worker thread, delivering its events through
    /// a queue holding at most `capacity` events.
    ///
    /// An `Err` returned by the producer is delivered as the final item.
    pub fn spawn<F>(name: &str, capacity: usize, producer: F) -> Result<Self>
    where
        F: FnOnce(&RunSink) -> Result<()> + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        let worker = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let sink = RunSink { tx };
                if let Err(e) = producer(&sink) {
                    let _ = sink.tx.send(Err(e));
                }
            })?;

        Ok(Self {
            inner: StreamInner::Channel {
                rx: Some(rx),
                worker: Some(worker),
            },
        })
    }

    /// Stop the producer and release the stream. Idempotent.
    pub fn close(&mut self) {
        if let StreamInner::Channel { rx, worker } = &mut self.inner {
            // Disconnect first so a blocked producer wakes up and exits.
            drop(rx.take());
            if let Some(handle) = worker.take() {
                if handle.join().is_err() {
                    log::warn!("Run producer thread panicked");
                }
            }
        }
        self.inner = StreamInner::Closed;
    }

    /// Whether the stream has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.inner, StreamInner::Closed)
    }
}

impl Iterator for RunEventStream {
    type Item = Result<RunEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            StreamInner::Buffered(events) => events.next().map(Ok),
            StreamInner::Channel { rx, worker } => {
                let received = rx.as_ref().and_then(|rx| rx.recv().ok());
                if received.is_none() {
                    // Producer finished and hung up.
                    drop(rx.take());
                    if let Some(handle) = worker.take() {
                        if handle.join().is_err() {
                            return Some(Err(Error::Corrupt(
                                "run producer thread panicked".to_string(),
                            )));
                        }
                    }
                }
                received
            }
            StreamInner::Closed => None,
        }
    }
}

impl Drop for RunEventStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Producer side of a threaded [`RunEventStream`].
pub struct RunSink {
    tx: Sender<Result<RunEvent>>,
}

impl RunSink {
    /// Send one event, blocking while the queue is full.
    ///
    /// Returns `false` once the consumer has gone; the producer should stop.
    pub fn emit(&self, event: RunEvent) -> bool {
        self.tx.send(Ok(event)).is_ok()
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16 with byte order mark
    if bytes.len() >= 2 && (bytes[..2] == [0xFE, 0xFF] || bytes[..2] == [0xFF, 0xFE]) {
        let big_endian = bytes[0] == 0xFE;
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| {
                if big_endian {
                    u16::from_be_bytes([c[0], c[1]])
                } else {
                    u16::from_le_bytes([c[0], c[1]])
                }
            })
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
