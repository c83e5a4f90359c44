//! Output transports.
//!
//! A cursor's collections can be encoded eagerly as one JSON value
//! ([`to_json`]) or incrementally as JSON lines ([`json_lines`],
//! [`write_json_lines`], [`write_records`]). Both transports use the same
//! field names, so re-parsed output is identical across them.

mod json;
mod jsonl;

pub use json::{to_json, Collection, JsonFormat};
pub use jsonl::{json_lines, write_json_lines, write_records, JsonLines, Record};
