//! Font and text style rows.

use serde::{Deserialize, Serialize};

/// Default colour for text with no explicit fill.
pub const BLACK: &str = "rgba(0,0,0,255)";

/// A canonical font.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Font {
    /// Font identifier, assigned in first-seen order
    pub font_id: u32,

    /// Font name as reported by the backend
    pub name: String,
}

/// A canonical text style: a font plus rendering attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Style identifier, assigned in first-seen order
    pub style_id: u32,

    /// Font this style renders with
    pub font_id: u32,

    /// Font size in backend units
    pub font_size: f64,

    /// Fill colour as `rgba(r,g,b,a)`
    pub color: String,

    /// `"normal"` or `"bold"`
    pub weight: String,

    /// Italic flag, serialized as 0/1
    #[serde(with = "flag")]
    pub italic: bool,

    /// Underline flag, serialized as 0/1
    #[serde(with = "flag")]
    pub underline: bool,
}

/// Weight name for a bold flag.
pub fn weight_name(bold: bool) -> &'static str {
    if bold {
        "bold"
    } else {
        "normal"
    }
}

/// Format colour components as `rgba(r,g,b,a)`.
pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> String {
    format!("rgba({},{},{},{})", r, g, b, a)
}

/// Parse a hex colour (`RRGGBB` or `AARRGGBB`) into `rgba(r,g,b,a)`.
pub fn hex_color(hex: &str) -> Option<String> {
    let hex = hex.trim().trim_start_matches('#');
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some(rgba(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(rgba(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
        _ => None,
    }
}

/// Serialize booleans as the integers 0 and 1.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(deserializer)? != 0)
    }
}
