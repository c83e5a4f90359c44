//! Cursor over one opened document.
//!
//! A [`Cursor`] moves through three states. It is `Created` with the source
//! bytes, becomes `Open` on first access (detection, backend decode and page
//! rows happen then), and ends `Closed` after [`Cursor::close`], a fatal error,
//! or an exhausted [`BBoxStream`]. Every accessor on a closed cursor fails
//! with [`Error::CursorClosed`].
//!
//! # Example
//!
//! ```no_run
//! use bboxes::Cursor;
//!
//! fn main() -> bboxes::Result<()> {
//!     let data = std::fs::read("report.pdf")?;
//!     let mut cursor = Cursor::new(data);
//!
//!     println!("{} pages", cursor.doc()?.page_count);
//!     for bbox in cursor.stream_bboxes()? {
//!         let bbox = bbox?;
//!         println!("{} @ ({}, {}): {}", bbox.page_id, bbox.x, bbox.y, bbox.text);
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;

use crate::detect::detect;
use crate::error::{Error, Result};
use crate::model::{
    next_document_id, BBox, Document, DocumentModel, Font, IngestStats, Page, SourceType, Style,
};
use crate::parser::{decoder_for, Decoder, ExtractOptions, RunEventStream};

/// How the backend is chosen.
enum BackendSelection {
    /// Detect from the bytes
    Auto,
    /// Explicit built-in backend
    Forced(SourceType),
    /// Caller-supplied decoder
    Custom(Box<dyn Decoder + Send>),
}

enum State {
    Created,
    Open(Box<OpenState>),
    Closed,
}

struct OpenState {
    model: DocumentModel,
    runs: RunEventStream,
    drained: bool,
}

impl OpenState {
    /// Ingest runs until one yields a bounding box or the stream ends.
    ///
    /// Damaged runs are counted and skipped. The returned box is not retained.
    fn advance(&mut self) -> Result<Option<BBox>> {
        if self.drained {
            return Ok(None);
        }
        loop {
            let run = match self.runs.next() {
                Some(run) => run?,
                None => {
                    self.drained = true;
                    let stats = self.model.stats();
                    log::debug!(
                        "Drained document {}: {} bboxes, {} filtered, {} skipped",
                        self.model.document().document_id,
                        stats.bboxes,
                        stats.filtered,
                        stats.skipped_runs()
                    );
                    return Ok(None);
                }
            };

            match self.model.ingest(run) {
                Ok(Some(bbox)) => return Ok(Some(bbox)),
                Ok(None) => {}
                Err(e) if e.is_run_level() => log::warn!("Skipping run: {}", e),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Stateful reader of one document's normalized entities.
///
/// Not meant to be shared between threads; separate cursors are independent
/// and may run in parallel.
pub struct Cursor {
    data: Vec<u8>,
    options: ExtractOptions,
    selection: BackendSelection,
    state: State,
}

impl Cursor {
    /// Create a cursor that detects the format on first access.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self::with_options(data, ExtractOptions::default())
    }

    /// Create a cursor with options. Nothing is parsed until first access.
    pub fn with_options(data: impl Into<Vec<u8>>, options: ExtractOptions) -> Self {
        let selection = match options.backend {
            Some(source_type) => BackendSelection::Forced(source_type),
            None => BackendSelection::Auto,
        };
        Self {
            data: data.into(),
            options,
            selection,
            state: State::Created,
        }
    }

    /// Create a cursor fed by a caller-supplied decoder.
    pub fn with_decoder<D>(data: impl Into<Vec<u8>>, decoder: D, options: ExtractOptions) -> Self
    where
        D: Decoder + Send + 'static,
    {
        Self {
            data: data.into(),
            options,
            selection: BackendSelection::Custom(Box::new(decoder)),
            state: State::Created,
        }
    }

    /// Open a document right away.
    ///
    /// Format and document level errors are returned here; no cursor is
    /// produced for a document that cannot be opened.
    pub fn open(data: impl Into<Vec<u8>>, options: ExtractOptions) -> Result<Self> {
        let mut cursor = Self::with_options(data, options);
        cursor.ensure_open()?;
        Ok(cursor)
    }

    /// The document row.
    pub fn doc(&mut self) -> Result<Document> {
        Ok(self.ensure_open()?.model.document())
    }

    /// Pages ordered by page number.
    pub fn pages(&mut self) -> Result<&[Page]> {
        Ok(self.ensure_open()?.model.pages())
    }

    /// Fonts in id order. Ingests the whole document first.
    pub fn fonts(&mut self) -> Result<&[Font]> {
        Ok(self.drain()?.model.fonts())
    }

    /// Styles in id order. Ingests the whole document first.
    pub fn styles(&mut self) -> Result<&[Style]> {
        Ok(self.drain()?.model.styles())
    }

    /// Buffered bounding boxes in emission order.
    ///
    /// Ingests the whole document and keeps every box, so the sequence can
    /// be requested again.
    pub fn bboxes(&mut self) -> Result<std::slice::Iter<'_, BBox>> {
        Ok(self.drain()?.model.bboxes().iter())
    }

    /// Single-pass bounding boxes, ingested as the stream is read.
    ///
    /// Boxes already buffered by [`bboxes`](Self::bboxes) are replayed first.
    /// The cursor closes when the stream is exhausted or dropped.
    pub fn stream_bboxes(&mut self) -> Result<BBoxStream<'_>> {
        self.ensure_open()?;
        Ok(BBoxStream {
            cursor: self,
            replayed: 0,
            done: false,
        })
    }

    /// Ingestion counters so far.
    pub fn stats(&self) -> Result<IngestStats> {
        match &self.state {
            State::Open(open) => Ok(open.model.stats()),
            State::Created => Ok(IngestStats::default()),
            State::Closed => Err(Error::CursorClosed),
        }
    }

    /// Whether the cursor has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Stop the backend and release all buffered state. Idempotent.
    pub fn close(&mut self) {
        if let State::Open(open) = &mut self.state {
            open.runs.close();
            log::debug!("Closed document {}", open.model.document().document_id);
        }
        self.state = State::Closed;
        self.data = Vec::new();
    }

    /// Next box of a single-pass read: buffered boxes from `*replayed` on,
    /// then boxes ingested on demand and not retained.
    pub(crate) fn next_streamed(&mut self, replayed: &mut usize) -> Result<Option<BBox>> {
        if let Some(bbox) = self.ensure_open()?.model.bboxes().get(*replayed) {
            let bbox = bbox.clone();
            *replayed += 1;
            return Ok(Some(bbox));
        }
        self.pull()
    }

    /// Next bounding box from the backend, without retaining it.
    ///
    /// A fatal error closes the cursor.
    fn pull(&mut self) -> Result<Option<BBox>> {
        let result = self.ensure_open()?.advance();
        if result.is_err() {
            self.close();
        }
        result
    }

    /// The model of an open cursor.
    pub(crate) fn model_mut(&mut self) -> Result<&mut DocumentModel> {
        Ok(&mut self.ensure_open()?.model)
    }

    /// Ingest every remaining run, retaining the boxes.
    fn drain(&mut self) -> Result<&OpenState> {
        loop {
            let open = self.ensure_open()?;
            if open.drained {
                break;
            }
            match open.advance() {
                Ok(Some(bbox)) => open.model.push_bbox(bbox),
                Ok(None) => {}
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            }
        }
        match &self.state {
            State::Open(open) => Ok(&**open),
            _ => Err(Error::CursorClosed),
        }
    }

    fn ensure_open(&mut self) -> Result<&mut OpenState> {
        if let State::Created = self.state {
            match self.start() {
                Ok(open) => self.state = State::Open(Box::new(open)),
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            }
        }
        match &mut self.state {
            State::Open(open) => Ok(&mut **open),
            _ => Err(Error::CursorClosed),
        }
    }

    /// Created → Open: select the backend, decode, build the page rows.
    fn start(&mut self) -> Result<OpenState> {
        let data = std::mem::take(&mut self.data);

        let (decoder, forced): (&dyn Decoder, Option<SourceType>) = match &self.selection {
            BackendSelection::Auto => {
                let source_type = detect(&data).ok_or(Error::UnsupportedFormat)?;
                log::debug!("Detected {} source", source_type);
                (decoder_for(source_type) as &dyn Decoder, None)
            }
            BackendSelection::Forced(source_type) => {
                log::debug!("Using {} backend", source_type);
                (decoder_for(*source_type) as &dyn Decoder, Some(*source_type))
            }
            BackendSelection::Custom(decoder) => {
                log::debug!("Using custom {} decoder", decoder.source_type());
                (decoder.as_ref() as &dyn Decoder, None)
            }
        };

        let extraction = decoder.decode(&data, &self.options).map_err(|e| match (forced, e) {
            (Some(backend), Error::Corrupt(reason)) => Error::BackendMismatch { backend, reason },
            (_, e) => e,
        })?;

        let document_id = self.options.document_id.unwrap_or_else(next_document_id);
        let model = DocumentModel::open(
            extraction.source_type,
            &data,
            &extraction.pages,
            document_id,
            self.options.filename.clone(),
        )?
        .with_font_identity(self.options.font_identity)
        .with_selection(self.options.pages.clone());

        let document = model.document();
        log::debug!(
            "Opened document {}: {} source, {} pages, checksum {}",
            document.document_id,
            document.source_type,
            document.page_count,
            document.checksum
        );

        Ok(OpenState {
            model,
            runs: extraction.runs,
            drained: false,
        })
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Created => "created",
            State::Open(_) => "open",
            State::Closed => "closed",
        };
        f.debug_struct("Cursor")
            .field("state", &state)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Single-pass sequence of bounding boxes. See [`Cursor::stream_bboxes`].
pub struct BBoxStream<'a> {
    cursor: &'a mut Cursor,
    replayed: usize,
    done: bool,
}

impl BBoxStream<'_> {
    fn finish(&mut self) {
        self.done = true;
        self.cursor.close();
    }
}

impl Iterator for BBoxStream<'_> {
    type Item = Result<BBox>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.cursor.next_streamed(&mut self.replayed) {
            Ok(Some(bbox)) => Some(Ok(bbox)),
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl Drop for BBoxStream<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Extraction, PageGeometry, RawFont, RawStyle, RunEvent};

    /// Decoder replaying a fixed script.
    struct Scripted {
        pages: Vec<PageGeometry>,
        runs: Vec<RunEvent>,
    }

    impl Decoder for Scripted {
        fn source_type(&self) -> SourceType {
            SourceType::Text
        }

        fn decode(&self, _data: &[u8], _options: &ExtractOptions) -> Result<Extraction> {
            Ok(Extraction::new(
                SourceType::Text,
                self.pages.clone(),
                RunEventStream::from_events(self.runs.clone()),
            ))
        }
    }

    fn run(page: u32, text: &str) -> RunEvent {
        RunEvent::new(
            page,
            (0.0, 0.0, text.len() as f64, 1.0),
            text,
            RawFont::named("Mono"),
            RawStyle::new(12.0),
        )
    }

    fn scripted(pages: usize, runs: Vec<RunEvent>) -> Cursor {
        let decoder = Scripted {
            pages: vec![PageGeometry::new(80.0, 60.0); pages],
            runs,
        };
        Cursor::with_decoder(b"script".to_vec(), decoder, ExtractOptions::default())
    }

    #[test]
    fn test_lazy_open() {
        let mut cursor = Cursor::new(b"Hello\n".to_vec());
        assert!(!cursor.is_closed());
        assert_eq!(cursor.stats().unwrap(), IngestStats::default());
        assert_eq!(cursor.doc().unwrap().source_type, SourceType::Text);
    }

    #[test]
    fn test_unknown_format() {
        let err = Cursor::open(vec![0u8, 1, 2, 3], ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat));
    }

    #[test]
    fn test_forced_backend_mismatch() {
        let options = ExtractOptions::default().with_backend(SourceType::Xlsx);
        let err = Cursor::open(b"just text".to_vec(), options).unwrap_err();
        assert!(matches!(
            err,
            Error::BackendMismatch {
                backend: SourceType::Xlsx,
                ..
            }
        ));
    }

    #[test]
    fn test_failed_lazy_open_closes() {
        let mut cursor = Cursor::new(vec![0u8; 4]);
        assert!(matches!(cursor.pages(), Err(Error::UnsupportedFormat)));
        assert!(cursor.is_closed());
        assert!(matches!(cursor.pages(), Err(Error::CursorClosed)));
    }

    #[test]
    fn test_buffered_bboxes_are_restartable() {
        let mut cursor = scripted(1, vec![run(1, "a"), run(1, "b")]);
        let first: Vec<u32> = cursor.bboxes().unwrap().map(|b| b.bbox_id).collect();
        let second: Vec<u32> = cursor.bboxes().unwrap().map(|b| b.bbox_id).collect();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_stream_replays_then_closes() {
        let mut cursor = scripted(1, vec![run(1, "a"), run(1, "b")]);
        assert_eq!(cursor.fonts().unwrap().len(), 1);

        let texts: Vec<String> = cursor
            .stream_bboxes()
            .unwrap()
            .map(|b| b.unwrap().text)
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert!(cursor.is_closed());
        assert!(matches!(cursor.doc(), Err(Error::CursorClosed)));
    }

    #[test]
    fn test_dropped_stream_closes_cursor() {
        let mut cursor = scripted(1, vec![run(1, "a"), run(1, "b"), run(1, "c")]);
        {
            let mut stream = cursor.stream_bboxes().unwrap();
            assert_eq!(stream.next().unwrap().unwrap().text, "a");
        }
        assert!(cursor.is_closed());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut cursor = scripted(1, vec![run(1, "a")]);
        cursor.doc().unwrap();
        cursor.close();
        cursor.close();
        assert!(cursor.is_closed());
        assert!(matches!(cursor.fonts(), Err(Error::CursorClosed)));
        assert!(matches!(cursor.bboxes(), Err(Error::CursorClosed)));
        assert!(matches!(cursor.stream_bboxes(), Err(Error::CursorClosed)));
        assert!(matches!(cursor.stats(), Err(Error::CursorClosed)));
    }

    #[test]
    fn test_skipped_runs_are_counted() {
        let mut cursor = scripted(3, vec![run(1, "a"), run(5, "lost"), run(3, "c")]);
        let texts: Vec<&str> = cursor.bboxes().unwrap().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c"]);
        assert_eq!(cursor.doc().unwrap().skipped_runs, 1);
        assert_eq!(cursor.stats().unwrap().out_of_range, 1);
    }

    #[test]
    fn test_empty_geometry_is_malformed() {
        let mut cursor = scripted(0, Vec::new());
        assert!(matches!(cursor.doc(), Err(Error::MalformedDocument(_))));
        assert!(cursor.is_closed());
    }
}
