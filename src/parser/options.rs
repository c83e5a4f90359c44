//! Extraction options and configuration.

use std::ops::RangeInclusive;

use crate::model::{FontIdentity, SourceType};

/// Default number of run events buffered between a backend worker and the consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Options for opening and extracting a document.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Password for encrypted documents
    pub password: Option<String>,

    /// Explicit backend; `None` detects the format from the bytes
    pub backend: Option<SourceType>,

    /// Filename recorded on the document row
    pub filename: Option<String>,

    /// Explicit document id; `None` takes the next process-local id
    pub document_id: Option<u32>,

    /// Which pages to extract runs from
    pub pages: PageSelection,

    /// How raw font descriptors collapse into fonts
    pub font_identity: FontIdentity,

    /// Error handling mode for undecodable pages
    pub error_mode: ErrorMode,

    /// Whether to decode pages in parallel
    pub parallel: bool,

    /// Bound on queued run events between backend and consumer
    pub channel_capacity: usize,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set password for encrypted documents.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Force a backend instead of detecting the format.
    pub fn with_backend(mut self, backend: SourceType) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Record a filename on the document row.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Use a fixed document id.
    pub fn with_document_id(mut self, document_id: u32) -> Self {
        self.document_id = Some(document_id);
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set font identity policy.
    pub fn with_font_identity(mut self, identity: FontIdentity) -> Self {
        self.font_identity = identity;
        self
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip undecodable pages).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the run queue capacity (minimum 1).
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            password: None,
            backend: None,
            filename: None,
            document_id: None,
            pages: PageSelection::All,
            font_identity: FontIdentity::default(),
            error_mode: ErrorMode::Strict,
            parallel: true,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Error handling mode for pages a backend cannot decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Abort the document
    #[default]
    Strict,
    /// Skip the page's runs and continue
    Lenient,
}

/// Page selection for extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Extract all pages
    #[default]
    All,
    /// Extract a range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Extract specific pages (1-indexed)
    Pages(Vec<u32>),
    /// Extract several ranges (inclusive, 1-indexed, sorted and disjoint)
    Ranges(Vec<RangeInclusive<u32>>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
            PageSelection::Ranges(ranges) => ranges.iter().any(|r| r.contains(&page)),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    ///
    /// Pages are 1-based, so `0` and reversed ranges are rejected.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        let mut ranges = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            let (start, end) = match part.split_once('-') {
                Some((start, end)) => (parse_page(start)?, parse_page(end)?),
                None => {
                    let page = parse_page(part)?;
                    (page, page)
                }
            };
            if start > end {
                return Err(format!("Invalid page range: {}", part));
            }
            ranges.push(start..=end);
        }

        ranges.sort_unstable_by_key(|r| *r.start());
        let mut merged: Vec<RangeInclusive<u32>> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if *range.start() <= last.end().saturating_add(1) => {
                    *last = *last.start()..=(*last.end()).max(*range.end());
                }
                _ => merged.push(range),
            }
        }

        Ok(match merged.as_slice() {
            [single] => PageSelection::Range(single.clone()),
            _ if merged.iter().all(|r| r.start() == r.end()) => {
                PageSelection::Pages(merged.iter().map(|r| *r.start()).collect())
            }
            _ => PageSelection::Ranges(merged),
        })
    }
}

fn parse_page(s: &str) -> Result<u32, String> {
    match s.trim().parse::<u32>() {
        Ok(0) => Err("Page numbers start at 1".to_string()),
        Ok(page) => Ok(page),
        Err(_) => Err(format!("Invalid page number: {}", s.trim())),
    }
}
