//! Page-level types.

use serde::{Deserialize, Serialize};

/// A single page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page identifier (equal to the page number)
    pub page_id: u32,

    /// Owning document
    pub document_id: u32,

    /// Page number (1-indexed, dense)
    pub page_number: u32,

    /// Width in backend geometry units (points, columns, characters)
    pub width: f64,

    /// Height in backend geometry units (points, rows, lines)
    pub height: f64,
}

impl Page {
    /// Create a new page.
    pub fn new(document_id: u32, page_number: u32, width: f64, height: f64) -> Self {
        Self {
            page_id: page_number,
            document_id,
            page_number,
            width,
            height,
        }
    }
}
