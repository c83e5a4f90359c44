//! Document-level types.

use serde::{Deserialize, Serialize};

/// Kind of source a document was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Portable Document Format
    Pdf,
    /// Office Open XML spreadsheet
    Xlsx,
    /// Plain text
    Text,
    /// Office Open XML word-processor document
    Docx,
}

impl SourceType {
    /// All supported source types, in detection precedence order.
    pub const ALL: [SourceType; 4] = [
        SourceType::Pdf,
        SourceType::Xlsx,
        SourceType::Docx,
        SourceType::Text,
    ];

    /// Short lowercase name used in output (`"pdf"`, `"xlsx"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Pdf => "pdf",
            SourceType::Xlsx => "xlsx",
            SourceType::Text => "text",
            SourceType::Docx => "docx",
        }
    }

    /// Parse a source type name. Accepts common file extensions as aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(SourceType::Pdf),
            "xlsx" | "spreadsheet" => Some(SourceType::Xlsx),
            "text" | "txt" | "plain" => Some(SourceType::Text),
            "docx" | "word" => Some(SourceType::Docx),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The document row: one per successfully opened source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Process-local identifier, unique per open session
    pub document_id: u32,

    /// Source format
    pub source_type: SourceType,

    /// Original filename, if the caller supplied one
    pub filename: Option<String>,

    /// MD5 hex digest of the source bytes
    pub checksum: String,

    /// Number of pages reported by the backend
    pub page_count: u32,

    /// Runs dropped so far because of bad geometry or an out-of-range page.
    /// Not part of the serialized row.
    #[serde(skip)]
    pub skipped_runs: u64,
}

impl Document {
    /// Create a document row.
    pub fn new(
        document_id: u32,
        source_type: SourceType,
        filename: Option<String>,
        checksum: impl Into<String>,
        page_count: u32,
    ) -> Self {
        Self {
            document_id,
            source_type,
            filename,
            checksum: checksum.into(),
            page_count,
            skipped_runs: 0,
        }
    }
}
