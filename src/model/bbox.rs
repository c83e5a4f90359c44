//! Positioned text runs.

use serde::{Deserialize, Serialize};

/// One extracted text run with its position and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    /// Run identifier, assigned in emission order
    pub bbox_id: u32,

    /// Page the run is on
    pub page_id: u32,

    /// Style the run renders with
    pub style_id: u32,

    /// Left edge
    pub x: f64,

    /// Top edge
    pub y: f64,

    /// Width (never negative)
    pub w: f64,

    /// Height (never negative)
    pub h: f64,

    /// Decoded text, possibly empty
    pub text: String,

    /// Backend-specific fields
    #[serde(flatten)]
    pub ext: BBoxExt,
}

/// Optional fields some backends attach to a run.
///
/// Consumers that only care about the base fields can ignore this entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBoxExt {
    /// Spreadsheet formula (`"=SUM(A1:A3)"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl BBoxExt {
    /// Whether no extension field is set.
    pub fn is_empty(&self) -> bool {
        self.formula.is_none()
    }
}

impl BBox {
    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Formula attached by the spreadsheet backend, if any.
    pub fn formula(&self) -> Option<&str> {
        self.ext.formula.as_deref()
    }
}
