//! The normalized entity graph for one opened document.

use std::sync::atomic::{AtomicU32, Ordering};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::{PageGeometry, PageSelection, RunEvent};

use super::{BBox, BBoxExt, Document, EntityInterner, FontIdentity, Font, Page, SourceType, Style};

static NEXT_DOCUMENT_ID: AtomicU32 = AtomicU32::new(1);

/// Take the next process-local document id.
pub fn next_document_id() -> u32 {
    NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed)
}

/// MD5 hex digest of `data`.
pub fn checksum(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// Counters collected while ingesting runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Run events received from the backend
    pub runs_seen: u64,

    /// Bounding boxes produced
    pub bboxes: u64,

    /// Runs on pages outside the page selection
    pub filtered: u64,

    /// Runs dropped for referencing a page outside the document
    pub out_of_range: u64,

    /// Runs dropped for non-finite or negative geometry
    pub malformed: u64,

    /// Output lines that could not be serialized
    pub lines_skipped: u64,
}

impl IngestStats {
    /// Runs dropped because they were damaged.
    pub fn skipped_runs(&self) -> u64 {
        self.out_of_range + self.malformed
    }
}

/// Document, pages, fonts, styles and retained bounding boxes for one source.
///
/// [`ingest`](Self::ingest) is the only mutation path. Entities are append-only.
#[derive(Debug)]
pub struct DocumentModel {
    document: Document,
    pages: Vec<Page>,
    interner: EntityInterner,
    bboxes: Vec<BBox>,
    selection: PageSelection,
    next_bbox_id: u32,
    stats: IngestStats,
}

impl DocumentModel {
    /// Build the document and page rows from backend geometry.
    ///
    /// Fails with `MalformedDocument` if `geometry` is empty or has a
    /// non-finite or negative dimension.
    pub fn open(
        source_type: SourceType,
        data: &[u8],
        geometry: &[PageGeometry],
        document_id: u32,
        filename: Option<String>,
    ) -> Result<Self> {
        if geometry.is_empty() {
            return Err(Error::MalformedDocument(format!(
                "{} source reported no pages",
                source_type
            )));
        }

        let mut pages = Vec::with_capacity(geometry.len());
        for (i, g) in geometry.iter().enumerate() {
            let number = i as u32 + 1;
            if !is_valid_extent(g.width) || !is_valid_extent(g.height) {
                return Err(Error::MalformedDocument(format!(
                    "page {} has invalid size {}x{}",
                    number, g.width, g.height
                )));
            }
            pages.push(Page::new(document_id, number, g.width, g.height));
        }

        let document = Document::new(
            document_id,
            source_type,
            filename,
            checksum(data),
            pages.len() as u32,
        );

        Ok(Self {
            document,
            pages,
            interner: EntityInterner::default(),
            bboxes: Vec::new(),
            selection: PageSelection::All,
            next_bbox_id: 1,
            stats: IngestStats::default(),
        })
    }

    /// Set the font identity policy. Only allowed before any run is ingested.
    pub fn with_font_identity(mut self, identity: FontIdentity) -> Self {
        debug_assert!(self.interner.fonts().is_empty());
        self.interner = EntityInterner::new(identity);
        self
    }

    /// Restrict which pages produce bounding boxes.
    pub fn with_selection(mut self, selection: PageSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Turn one raw run into a bounding box.
    ///
    /// Returns `Ok(None)` for runs on unselected pages. Damaged runs fail with
    /// `OutOfRangePage` or `MalformedRun` and are counted; nothing is interned
    /// for them, so the model stays consistent and ingestion can continue.
    pub fn ingest(&mut self, run: RunEvent) -> Result<Option<BBox>> {
        self.stats.runs_seen += 1;

        let page_count = self.document.page_count;
        if run.page_index == 0 || run.page_index > page_count {
            self.stats.out_of_range += 1;
            return Err(Error::OutOfRangePage {
                page: run.page_index,
                page_count,
            });
        }

        if let Err(e) = validate_run(&run) {
            self.stats.malformed += 1;
            return Err(e);
        }

        if !self.selection.includes(run.page_index) {
            self.stats.filtered += 1;
            return Ok(None);
        }

        let font_id = self.interner.intern_font(&run.font);
        let style_id = self.interner.intern_style(&run.style, font_id);

        let bbox = BBox {
            bbox_id: self.next_bbox_id,
            page_id: self.pages[(run.page_index - 1) as usize].page_id,
            style_id,
            x: run.x,
            y: run.y,
            w: run.w,
            h: run.h,
            text: run.text,
            ext: BBoxExt {
                formula: run.formula,
            },
        };
        self.next_bbox_id += 1;
        self.stats.bboxes += 1;
        Ok(Some(bbox))
    }

    /// Retain a bounding box produced by [`ingest`](Self::ingest).
    pub fn push_bbox(&mut self, bbox: BBox) {
        debug_assert_eq!(bbox.bbox_id as usize, self.bboxes.len() + 1);
        self.bboxes.push(bbox);
    }

    /// The document row, with the current skipped-run count.
    pub fn document(&self) -> Document {
        Document {
            skipped_runs: self.stats.skipped_runs(),
            ..self.document.clone()
        }
    }

    /// Pages in page-number order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Fonts interned so far, in id order.
    pub fn fonts(&self) -> &[Font] {
        self.interner.fonts()
    }

    /// Styles interned so far, in id order.
    pub fn styles(&self) -> &[Style] {
        self.interner.styles()
    }

    /// Retained bounding boxes in emission order.
    pub fn bboxes(&self) -> &[BBox] {
        &self.bboxes
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub(crate) fn count_skipped_lines(&mut self, lines: u64) {
        self.stats.lines_skipped += lines;
    }

    /// Check every reference in the model. Used by tests and debug builds.
    pub fn check_integrity(&self) -> std::result::Result<(), String> {
        for (i, page) in self.pages.iter().enumerate() {
            if page.page_number != i as u32 + 1 {
                return Err(format!("page {} is out of sequence", page.page_number));
            }
        }
        for style in self.styles() {
            if self.interner.font(style.font_id).is_none() {
                return Err(format!(
                    "style {} references missing font {}",
                    style.style_id, style.font_id
                ));
            }
        }
        for bbox in &self.bboxes {
            if !self.pages.iter().any(|p| p.page_id == bbox.page_id) {
                return Err(format!(
                    "bbox {} references missing page {}",
                    bbox.bbox_id, bbox.page_id
                ));
            }
            if self.interner.style(bbox.style_id).is_none() {
                return Err(format!(
                    "bbox {} references missing style {}",
                    bbox.bbox_id, bbox.style_id
                ));
            }
        }
        Ok(())
    }
}

fn is_valid_extent(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn validate_run(run: &RunEvent) -> Result<()> {
    if !run.x.is_finite() || !run.y.is_finite() {
        return Err(Error::MalformedRun(format!(
            "non-finite position ({}, {}) on page {}",
            run.x, run.y, run.page_index
        )));
    }
    if !is_valid_extent(run.w) || !is_valid_extent(run.h) {
        return Err(Error::MalformedRun(format!(
            "invalid size {}x{} on page {}",
            run.w, run.h, run.page_index
        )));
    }
    if !run.style.font_size.is_finite() {
        return Err(Error::MalformedRun(format!(
            "non-finite font size on page {}",
            run.page_index
        )));
    }
    Ok(())
}
