//! Error types for the bboxes library.

use std::io;
use lopdf::encryption::DecryptionError;
use thiserror::Error;

use crate::model::SourceType;

/// Result type alias for bboxes operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while opening, ingesting or serializing a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Format detection found no matching backend.
    #[error("Unsupported format: no backend recognizes this input")]
    UnsupportedFormat,

    /// The explicitly selected backend rejected the input.
    #[error("Input does not parse as {backend}: {reason}")]
    BackendMismatch {
        /// The backend that was forced
        backend: SourceType,
        /// Why the backend rejected the bytes
        reason: String,
    },

    /// The source is encrypted and no password was supplied.
    #[error("Document is encrypted and requires a password")]
    AuthRequired,

    /// The supplied password is incorrect.
    #[error("Invalid password")]
    AuthFailed,

    /// The backend could not produce page geometry or a readable run stream.
    #[error("Corrupted document: {0}")]
    Corrupt(String),

    /// The backend recognizes the input but cannot handle this variant of it.
    #[error("Unsupported document feature: {0}")]
    Unsupported(String),

    /// Page geometry is empty or contains invalid dimensions.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A run references a page outside the document.
    #[error("Page {page} is out of range (document has {page_count} pages)")]
    OutOfRangePage {
        /// The 1-based page index declared by the run
        page: u32,
        /// Number of pages in the document
        page_count: u32,
    },

    /// A single run carries non-finite or negative geometry.
    #[error("Malformed run: {0}")]
    MalformedRun(String),

    /// The cursor has been closed.
    #[error("Cursor is closed")]
    CursorClosed,

    /// Error while encoding output.
    #[error("Rendering error: {0}")]
    Render(String),
}

impl Error {
    /// Whether this error concerns a single run and is recovered by skipping it.
    pub fn is_run_level(&self) -> bool {
        matches!(self, Error::OutOfRangePage { .. } | Error::MalformedRun(_))
    }

    /// Whether this error is an authentication failure of an encrypted source.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::AuthRequired | Error::AuthFailed)
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => Error::AuthFailed,
            lopdf::Error::Decryption(DecryptionError::UnsupportedEncryption) => {
                Error::Unsupported(format!("PDF encryption: {}", err))
            }
            _ => Error::Corrupt(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::Corrupt(format!("invalid package: {}", err)),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Corrupt(format!("invalid XML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::AuthRequired;
        assert_eq!(err.to_string(), "Document is encrypted and requires a password");

        let err = Error::OutOfRangePage {
            page: 5,
            page_count: 3,
        };
        assert_eq!(
            err.to_string(),
            "Page 5 is out of range (document has 3 pages)"
        );

        let err = Error::BackendMismatch {
            backend: SourceType::Xlsx,
            reason: "not a zip archive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Input does not parse as xlsx: not a zip archive"
        );
    }

    #[test]
    fn test_run_level_classification() {
        assert!(Error::MalformedRun("nan".into()).is_run_level());
        assert!(Error::OutOfRangePage {
            page: 0,
            page_count: 1
        }
        .is_run_level());
        assert!(!Error::Corrupt("x".into()).is_run_level());
        assert!(!Error::CursorClosed.is_run_level());
    }

    #[test]
    fn test_lopdf_decryption_conversion() {
        let err: Error = lopdf::Error::Decryption(DecryptionError::IncorrectPassword).into();
        assert!(matches!(err, Error::AuthFailed));

        let err: Error = lopdf::Error::Decryption(DecryptionError::UnsupportedEncryption).into();
        assert!(matches!(err, Error::Unsupported(_)));

        let err: Error = lopdf::Error::Decryption(DecryptionError::MissingFileID).into();
        assert!(matches!(err, Error::Corrupt(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
