//! Source format detection.
//!
//! Classification only looks at a bounded prefix of the input and never
//! parses the document. Signatures are checked in a fixed precedence order
//! (PDF, ZIP package, plain text), so at most one format matches.

use crate::model::SourceType;

/// Maximum number of bytes inspected.
pub const SNIFF_LIMIT: usize = 64 * 1024;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Some producers put junk before the header; readers accept it within 1 KiB.
const PDF_HEADER_WINDOW: usize = 1024;

/// ZIP local file header signature.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// OLE compound file signature (encrypted OOXML, legacy Office).
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// How sure the detector is about a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    /// Nothing matched
    None,
    /// Heuristic match (plain text)
    Low,
    /// Signature found, but not where the format puts it
    Medium,
    /// Signature found at the expected position
    High,
}

/// Diagnostic classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    /// Detected source type, `None` when unknown
    pub kind: Option<SourceType>,
    pub confidence: Confidence,
    /// Format version, if the header carries one (e.g. PDF "1.7")
    pub version: Option<String>,
    /// Free-form observations (e.g. "encrypted-container")
    pub hints: Vec<String>,
}

impl FormatInfo {
    fn unknown() -> Self {
        Self {
            kind: None,
            confidence: Confidence::None,
            version: None,
            hints: Vec::new(),
        }
    }

    fn matched(kind: SourceType, confidence: Confidence) -> Self {
        Self {
            kind: Some(kind),
            confidence,
            version: None,
            hints: Vec::new(),
        }
    }

    fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

impl std::fmt::Display for FormatInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.kind, &self.version) {
            (Some(kind), Some(version)) => write!(f, "{} {}", kind, version),
            (Some(kind), None) => write!(f, "{}", kind),
            (None, _) => write!(f, "unknown"),
        }
    }
}

/// Classify `data`, returning `None` when no backend matches.
///
/// # Example
/// ```
/// use bboxes::{detect, SourceType};
///
/// assert_eq!(detect(b"%PDF-1.7\n"), Some(SourceType::Pdf));
/// assert_eq!(detect(b"hello\nworld\n"), Some(SourceType::Text));
/// assert_eq!(detect(&[0u8, 159, 146, 150]), None);
/// ```
pub fn detect(data: &[u8]) -> Option<SourceType> {
    info(data).kind
}

/// Classify `data` with confidence and hints. Does not open the document.
pub fn info(data: &[u8]) -> FormatInfo {
    let prefix = &data[..data.len().min(SNIFF_LIMIT)];
    let truncated = data.len() > prefix.len();

    if let Some(info) = sniff_pdf(prefix) {
        // A header quoted inside plain text does not make it a PDF.
        if prefix.starts_with(PDF_MAGIC) || !looks_like_text(prefix, truncated) {
            return info;
        }
    }
    if prefix.starts_with(ZIP_MAGIC) {
        return sniff_package(prefix);
    }
    if prefix.starts_with(CFB_MAGIC) {
        return FormatInfo::unknown().hint("encrypted-container");
    }
    if looks_like_text(prefix, truncated) {
        return FormatInfo::matched(SourceType::Text, Confidence::Low);
    }
    FormatInfo::unknown()
}

/// Check if bytes start like a PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect(data) == Some(SourceType::Pdf)
}

/// Check if bytes are an OLE compound file (how encrypted OOXML is packaged).
pub fn is_encrypted_container(data: &[u8]) -> bool {
    data.starts_with(CFB_MAGIC)
}

fn sniff_pdf(prefix: &[u8]) -> Option<FormatInfo> {
    let window = &prefix[..prefix.len().min(PDF_HEADER_WINDOW)];
    let offset = window
        .windows(PDF_MAGIC_LEN)
        .position(|w| w == PDF_MAGIC)?;

    let confidence = if offset == 0 {
        Confidence::High
    } else {
        Confidence::Medium
    };
    let mut info = FormatInfo::matched(SourceType::Pdf, confidence);

    let start = offset + PDF_MAGIC_LEN;
    if let Some(version_bytes) = prefix.get(start..start + VERSION_LEN) {
        let version = String::from_utf8_lossy(version_bytes).to_string();
        if is_valid_version(&version) {
            info.version = Some(version);
        }
    }
    if offset > 0 {
        info = info.hint(format!("header-offset:{}", offset));
    }
    Some(info)
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

/// Classify a ZIP package by the entry names in its local file headers.
fn sniff_package(prefix: &[u8]) -> FormatInfo {
    let mut offset = 0usize;
    let mut walked_all = true;

    while prefix[offset..].starts_with(ZIP_MAGIC) {
        let header = match prefix.get(offset..offset + 30) {
            Some(h) => h,
            None => break,
        };
        let flags = u16::from_le_bytes([header[6], header[7]]);
        let compressed = u32::from_le_bytes([header[18], header[19], header[20], header[21]]);
        let name_len = u16::from_le_bytes([header[26], header[27]]) as usize;
        let extra_len = u16::from_le_bytes([header[28], header[29]]) as usize;

        let name = match prefix.get(offset + 30..offset + 30 + name_len) {
            Some(n) => n,
            None => break,
        };
        if let Some(kind) = package_kind(name) {
            return FormatInfo::matched(kind, Confidence::High);
        }

        // Sizes live in a trailing data descriptor; we cannot skip the entry.
        if flags & 0x0008 != 0 {
            walked_all = false;
            break;
        }
        offset += 30 + name_len + extra_len + compressed as usize;
        if offset >= prefix.len() {
            walked_all = false;
            break;
        }
    }

    // Fall back to scanning for entry names anywhere in the prefix.
    for (needle, kind) in [(&b"word/"[..], SourceType::Docx), (&b"xl/"[..], SourceType::Xlsx)] {
        if prefix.windows(needle.len()).any(|w| w == needle) {
            return FormatInfo::matched(kind, Confidence::Medium);
        }
    }

    let info = FormatInfo::unknown().hint("zip-package");
    if walked_all {
        info
    } else {
        info.hint("truncated-scan")
    }
}

fn package_kind(name: &[u8]) -> Option<SourceType> {
    if name.starts_with(b"word/") {
        Some(SourceType::Docx)
    } else if name.starts_with(b"xl/") {
        Some(SourceType::Xlsx)
    } else {
        None
    }
}

/// Heuristic: non-empty, no NUL bytes, valid UTF-8 (or UTF-16 with BOM).
fn looks_like_text(prefix: &[u8], truncated: bool) -> bool {
    if prefix.is_empty() {
        return false;
    }
    if prefix.starts_with(&[0xFF, 0xFE]) || prefix.starts_with(&[0xFE, 0xFF]) {
        return true;
    }
    if prefix.contains(&0) {
        return false;
    }
    match std::str::from_utf8(prefix) {
        Ok(_) => true,
        // A multi-byte character cut off at the sniff limit is fine.
        Err(e) => truncated && e.error_len().is_none(),
    }
}
