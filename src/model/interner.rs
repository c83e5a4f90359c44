//! Font and style interning.
//!
//! Raw descriptors from a backend collapse into canonical [`Font`] and
//! [`Style`] rows. Ids are handed out in first-seen order starting at 1, so
//! interning the same event sequence twice yields the same ids.

use std::collections::HashMap;

use crate::parser::{RawFont, RawStyle};

use super::{Font, Style};

/// Policy deciding when two raw font descriptors are the same font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontIdentity {
    /// Exact name plus embedded-program fingerprint
    #[default]
    NameAndFingerprint,
    /// Exact name only
    Name,
    /// Name with any subset tag (`ABCDEF+`) removed; fingerprint ignored
    BaseName,
}

impl FontIdentity {
    fn key(&self, raw: &RawFont) -> FontKey {
        match self {
            FontIdentity::NameAndFingerprint => FontKey {
                name: raw.name.clone(),
                fingerprint: raw.fingerprint.clone(),
            },
            FontIdentity::Name => FontKey {
                name: raw.name.clone(),
                fingerprint: None,
            },
            FontIdentity::BaseName => FontKey {
                name: strip_subset_tag(&raw.name).to_string(),
                fingerprint: None,
            },
        }
    }
}

/// Remove a PDF subset tag: six uppercase ASCII letters followed by `+`.
pub fn strip_subset_tag(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() > 7 && bytes[6] == b'+' && bytes[..6].iter().all(u8::is_ascii_uppercase) {
        &name[7..]
    } else {
        name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FontKey {
    name: String,
    fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StyleKey {
    font_id: u32,
    font_size: u64,
    color: String,
    weight: String,
    italic: bool,
    underline: bool,
}

impl StyleKey {
    fn new(raw: &RawStyle, font_id: u32) -> Self {
        // -0.0 and 0.0 are the same size.
        let size = if raw.font_size == 0.0 { 0.0 } else { raw.font_size };
        Self {
            font_id,
            font_size: size.to_bits(),
            color: raw.color.clone(),
            weight: raw.weight.clone(),
            italic: raw.italic,
            underline: raw.underline,
        }
    }
}

/// Per-document font and style tables.
#[derive(Debug, Default)]
pub struct EntityInterner {
    identity: FontIdentity,
    font_index: HashMap<FontKey, u32>,
    fonts: Vec<Font>,
    style_index: HashMap<StyleKey, u32>,
    styles: Vec<Style>,
}

impl EntityInterner {
    /// Create an empty interner using `identity` to compare fonts.
    pub fn new(identity: FontIdentity) -> Self {
        Self {
            identity,
            ..Self::default()
        }
    }

    /// Return the id of the font matching `raw`, allocating one if it is new.
    pub fn intern_font(&mut self, raw: &RawFont) -> u32 {
        let key = self.identity.key(raw);
        if let Some(&id) = self.font_index.get(&key) {
            return id;
        }

        let id = self.fonts.len() as u32 + 1;
        self.fonts.push(Font {
            font_id: id,
            name: raw.name.clone(),
        });
        self.font_index.insert(key, id);
        id
    }

    /// Return the id of the style matching `raw` under `font_id`, allocating one if it is new.
    pub fn intern_style(&mut self, raw: &RawStyle, font_id: u32) -> u32 {
        let key = StyleKey::new(raw, font_id);
        if let Some(&id) = self.style_index.get(&key) {
            return id;
        }

        let id = self.styles.len() as u32 + 1;
        self.styles.push(Style {
            style_id: id,
            font_id,
            font_size: f64::from_bits(key.font_size),
            color: raw.color.clone(),
            weight: raw.weight.clone(),
            italic: raw.italic,
            underline: raw.underline,
        });
        self.style_index.insert(key, id);
        id
    }

    /// Fonts in id order.
    pub fn fonts(&self) -> &[Font] {
        &self.fonts
    }

    /// Styles in id order.
    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    pub fn font(&self, font_id: u32) -> Option<&Font> {
        font_id
            .checked_sub(1)
            .and_then(|i| self.fonts.get(i as usize))
    }

    pub fn style(&self, style_id: u32) -> Option<&Style> {
        style_id
            .checked_sub(1)
            .and_then(|i| self.styles.get(i as usize))
    }

    pub fn identity(&self) -> FontIdentity {
        self.identity
    }
}
