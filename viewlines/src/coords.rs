//! Coordinate types for the model and view spaces.
//!
//! Both spaces use 1-based lines and 1-based columns. A column counts `char`s of
//! the line, so column `n` sits before the `n`th character and `length + 1` is
//! the end of the line.
//!
//! The two position types are distinct so a model position can never be handed
//! to a view query by accident.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the stored text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ModelPosition {
    pub line: u32,
    pub column: u32,
}

impl ModelPosition {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for ModelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.line, self.column)
    }
}

/// A position in the rendered view, after wrapping and folding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ViewPosition {
    pub line: u32,
    pub column: u32,
}

impl ViewPosition {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for ViewPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ModelRange {
    pub start: ModelPosition,
    pub end: ModelPosition,
}

impl ModelRange {
    pub const fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start: ModelPosition::new(start_line, start_column),
            end: ModelPosition::new(end_line, end_column),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ViewRange {
    pub start: ViewPosition,
    pub end: ViewPosition,
}

impl ViewRange {
    pub const fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start: ViewPosition::new(start_line, start_column),
            end: ViewPosition::new(end_line, end_column),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// An inclusive range of line numbers, `start..=end`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    pub fn len(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Disambiguates a position that sits on a wrap or injected-text boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Affinity {
    /// Prefer the end of the preceding row or the left side of injected text.
    Left,
    /// Prefer the start of the following row or the right side of injected text.
    Right,
    #[default]
    None,
}

/// A position inside one model line's output, before it is placed in the view.
///
/// `row` is the 0-based wrapped row of the owning model line and `offset` a
/// 0-based offset into the injection-expanded text of that row (excluding the
/// wrap indent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OutputPosition {
    pub row: usize,
    pub offset: u32,
}

impl OutputPosition {
    pub const fn new(row: usize, offset: u32) -> Self {
        Self { row, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_order_by_line_then_column() {
        assert!(ViewPosition::new(1, 9) < ViewPosition::new(2, 1));
        assert!(ModelPosition::new(3, 1) < ModelPosition::new(3, 2));
    }

    #[test]
    fn line_range_len() {
        assert_eq!(LineRange::new(2, 4).len(), 3);
        assert_eq!(LineRange::new(4, 4).len(), 1);
        assert!(LineRange::new(5, 4).is_empty());
        assert!(LineRange::new(2, 4).contains(4));
        assert!(!LineRange::new(2, 4).contains(5));
    }
}
