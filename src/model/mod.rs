//! Normalized entity model.
//!
//! Every source format is reduced to the same five row types: one
//! [`Document`], its [`Page`]s, the [`Font`]s and [`Style`]s text is
//! rendered with, and one [`BBox`] per text run. [`DocumentModel`] owns
//! them and keeps every reference valid while runs are ingested.

mod bbox;
mod document;
mod document_model;
mod interner;
mod page;
mod style;

pub use bbox::{BBox, BBoxExt};
pub use document::{Document, SourceType};
pub use document_model::{checksum, next_document_id, DocumentModel, IngestStats};
pub use interner::{strip_subset_tag, EntityInterner, FontIdentity};
pub use page::Page;
pub use style::{hex_color, rgba, weight_name, Font, Style, BLACK};
