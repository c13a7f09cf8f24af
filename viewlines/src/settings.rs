//! Wrapping configuration.
//!
//! These are plain values so a host can load them from its own config files.
//! A `None` wrapping column disables wrapping entirely.

use serde::{Deserialize, Serialize};

/// Glyph metrics used to size characters in columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontInfo {
    pub half_width_character_width: f64,
    pub full_width_character_width: f64,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            half_width_character_width: 7.0,
            full_width_character_width: 14.0,
        }
    }
}

impl FontInfo {
    /// Columns taken by a full-width character, at least one.
    pub fn full_width_columns(&self) -> u32 {
        if self.half_width_character_width <= 0.0 {
            return 2;
        }
        let ratio = self.full_width_character_width / self.half_width_character_width;
        ratio.round().max(1.0) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrappingStrategy {
    /// Assume every glyph is a multiple of the half-width character.
    #[default]
    Simple,
    /// Measure rendered glyphs. Needs a computer that can do so.
    Advanced,
}

/// Indentation applied to wrapped continuation rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrappingIndent {
    None,
    #[default]
    Same,
    Indent,
    DeepIndent,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapSettings {
    pub font: FontInfo,
    pub strategy: WrappingStrategy,
    pub wrapping_column: Option<u32>,
    pub wrapping_indent: WrappingIndent,
}

impl WrapSettings {
    pub fn wrapped_at(column: u32) -> Self {
        Self {
            wrapping_column: Some(column),
            ..Self::default()
        }
    }

    /// True when `other` differs from `self` only in the wrapping column.
    pub fn only_column_differs(&self, other: &WrapSettings) -> bool {
        self.font == other.font
            && self.strategy == other.strategy
            && self.wrapping_indent == other.wrapping_indent
            && self.wrapping_column != other.wrapping_column
    }
}

pub const DEFAULT_TAB_SIZE: u32 = 4;
