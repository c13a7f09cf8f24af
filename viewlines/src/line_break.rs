//! Break data describing how one model line is laid out over view rows.
//!
//! Offsets in [`LineBreakData`] refer to the *unwrapped* line: the model text
//! with every injected run spliced in. Row `k` covers the unwrapped range
//! `[break_offsets[k - 1], break_offsets[k])` (starting at 0 for the first
//! row), so the last break offset always equals the unwrapped length.
//!
//! ```text
//! model line:   "let x = 1;"      injection ": u32" at offset 5
//! unwrapped:    "let x: u32 = 1;"
//! break offsets [7, 15] with indent 4
//! row 0:        "let x: "
//! row 1:        "    u32 = 1;"
//! ```
//!
//! Output offsets of an [`OutputPosition`] exclude the wrap indent; view
//! columns include it.

use crate::{
    coords::{Affinity, OutputPosition},
    injected_text::{Injection, InjectedTextOptions},
    settings::WrapSettings,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBreakData {
    /// Injected runs ordered by model offset.
    pub injections: Vec<Injection>,
    /// End offset of every row in the unwrapped line.
    pub break_offsets: Vec<u32>,
    /// Visible column of the unwrapped line at every break.
    pub break_offsets_visible_column: Vec<u32>,
    /// Columns of indentation prepended to every continuation row.
    pub wrapped_text_indent_length: u32,
}

/// Location of an injected run inside the unwrapped line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InjectedSpan {
    index: usize,
    start: u32,
    len: u32,
}

impl LineBreakData {
    pub fn new(
        injections: Vec<Injection>,
        break_offsets: Vec<u32>,
        break_offsets_visible_column: Vec<u32>,
        wrapped_text_indent_length: u32,
    ) -> Self {
        Self {
            injections,
            break_offsets,
            break_offsets_visible_column,
            wrapped_text_indent_length,
        }
    }

    pub fn has_injections(&self) -> bool {
        !self.injections.is_empty()
    }

    pub fn output_line_count(&self) -> usize {
        self.break_offsets.len()
    }

    fn row_start(&self, row: usize) -> u32 {
        match row {
            0 => 0,
            row => self
                .break_offsets
                .get(row - 1)
                .or(self.break_offsets.last())
                .copied()
                .unwrap_or(0),
        }
    }

    fn row_end(&self, row: usize) -> u32 {
        self.break_offsets
            .get(row)
            .or(self.break_offsets.last())
            .copied()
            .unwrap_or(0)
    }

    fn indent_of(&self, row: usize) -> u32 {
        if row > 0 {
            self.wrapped_text_indent_length
        } else {
            0
        }
    }

    /// Unwrapped offsets `[start, end)` covered by `row`.
    pub fn row_range(&self, row: usize) -> (u32, u32) {
        (self.row_start(row), self.row_end(row))
    }

    /// Length of `row` in columns, wrap indent included.
    pub fn line_length(&self, row: usize) -> u32 {
        self.row_end(row).saturating_sub(self.row_start(row)) + self.indent_of(row)
    }

    pub fn min_column(&self, row: usize) -> u32 {
        self.indent_of(row) + 1
    }

    pub fn max_column(&self, row: usize) -> u32 {
        self.line_length(row) + 1
    }

    pub fn start_visible_column(&self, row: usize) -> u32 {
        match row {
            0 => 0,
            row => self
                .break_offsets_visible_column
                .get(row - 1)
                .copied()
                .unwrap_or(0),
        }
    }

    /// Map an output offset (wrap indent excluded) back to a 0-based model offset.
    ///
    /// Offsets inside an injected run collapse onto the model offset the run is
    /// anchored at.
    pub fn input_offset_of(&self, row: usize, output_offset: u32) -> u32 {
        let mut offset = self.row_start(row) + output_offset;
        for injection in &self.injections {
            if offset <= injection.offset {
                break;
            }
            let len = injection.options.len();
            if offset < injection.offset + len {
                offset = injection.offset;
            } else {
                offset -= len;
            }
        }
        offset
    }

    /// Map a 0-based model offset to its output position.
    ///
    /// At an injection anchor `Right` places the position after the injected
    /// run, anything else before it.
    pub fn output_position_of(&self, input_offset: u32, affinity: Affinity) -> OutputPosition {
        let mut offset = input_offset;
        for injection in &self.injections {
            if input_offset < injection.offset
                || (affinity != Affinity::Right && input_offset == injection.offset)
            {
                break;
            }
            offset += injection.options.len();
        }
        self.unwrapped_to_output(offset, affinity)
    }

    /// Find the row owning an unwrapped offset.
    ///
    /// An offset on a break belongs to the following row unless `affinity` is
    /// `Left`, in which case it ends the preceding row.
    fn unwrapped_to_output(&self, offset: u32, affinity: Affinity) -> OutputPosition {
        let last = self.break_offsets.len().saturating_sub(1);
        let row = match affinity {
            Affinity::Left => self.break_offsets.partition_point(|&end| end < offset),
            _ => self.break_offsets.partition_point(|&end| end <= offset),
        }
        .min(last);
        OutputPosition::new(row, offset.saturating_sub(self.row_start(row)))
    }

    fn view_offset_to_unwrapped(&self, row: usize, view_offset: u32) -> u32 {
        self.row_start(row) + view_offset.saturating_sub(self.indent_of(row))
    }

    /// Convert an output position to a 1-based column within its row.
    pub fn view_column_of(&self, position: OutputPosition) -> u32 {
        position.offset + 1 + self.indent_of(position.row)
    }

    fn injected_span_at(&self, unwrapped_offset: u32) -> Option<InjectedSpan> {
        let mut injected_before = 0;
        for (index, injection) in self.injections.iter().enumerate() {
            let len = injection.options.len();
            let start = injection.offset + injected_before;
            if start > unwrapped_offset {
                break;
            }
            if unwrapped_offset <= start + len {
                return Some(InjectedSpan { index, start, len });
            }
            injected_before += len;
        }
        None
    }

    fn normalize_around_injections(&self, unwrapped_offset: u32, affinity: Affinity) -> u32 {
        let Some(span) = self.injected_span_at(unwrapped_offset) else {
            return unwrapped_offset;
        };

        let anchor = self.injections[span.index].offset;
        match affinity {
            Affinity::None => {
                if unwrapped_offset == span.start + span.len {
                    unwrapped_offset
                } else {
                    span.start
                }
            },
            Affinity::Right => {
                let mut result = span.start + span.len;
                for injection in self.injections[span.index + 1..]
                    .iter()
                    .take_while(|injection| injection.offset == anchor)
                {
                    result += injection.options.len();
                }
                result
            },
            Affinity::Left => {
                let mut result = span.start;
                for injection in self.injections[..span.index]
                    .iter()
                    .rev()
                    .take_while(|injection| injection.offset == anchor)
                {
                    result -= injection.options.len();
                }
                result
            },
        }
    }

    /// Move an output position out of injected text and across wrap boundaries
    /// in the direction given by `affinity`.
    ///
    /// `view_column` is the 1-based column within `row`, wrap indent included.
    pub fn normalize_output_position(
        &self,
        row: usize,
        view_column: u32,
        affinity: Affinity,
    ) -> OutputPosition {
        let view_offset = view_column.saturating_sub(1);
        if self.has_injections() {
            let unwrapped = self.view_offset_to_unwrapped(row, view_offset);
            let normalized = self.normalize_around_injections(unwrapped, affinity);
            if normalized != unwrapped {
                return self.unwrapped_to_output(normalized, affinity);
            }
        }

        let offset = view_offset.saturating_sub(self.indent_of(row));
        match affinity {
            Affinity::Left if row > 0 && view_column == self.min_column(row) => {
                let previous = row - 1;
                OutputPosition::new(previous, self.line_length(previous) - self.indent_of(previous))
            },
            Affinity::Right
                if row + 1 < self.output_line_count() && view_column == self.max_column(row) =>
            {
                OutputPosition::new(row + 1, 0)
            },
            _ => OutputPosition::new(row, offset),
        }
    }

    /// The injected run touching `view_column` of `row`, boundaries included.
    pub fn injected_text_at(&self, row: usize, view_column: u32) -> Option<&InjectedTextOptions> {
        let unwrapped = self.view_offset_to_unwrapped(row, view_column.saturating_sub(1));
        self.injected_span_at(unwrapped)
            .map(|span| &self.injections[span.index].options)
    }
}

/// One line submitted to a [`LineBreaksComputer`].
#[derive(Debug, Clone)]
pub struct LineBreakRequest {
    /// Model text of the line, without injected text.
    pub text: String,
    pub injections: Vec<Injection>,
    /// Break data computed for the same line under the previous settings.
    pub previous: Option<Arc<LineBreakData>>,
}

impl LineBreakRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            injections: Vec::new(),
            previous: None,
        }
    }
}

/// Computes wrap offsets for a batch of lines.
///
/// One result per request, in request order. `None` means the line needs no
/// break data at all: it fits in one row and carries no injected text.
pub trait LineBreaksComputer {
    fn compute(
        &self,
        settings: &WrapSettings,
        tab_size: u32,
        requests: Vec<LineBreakRequest>,
    ) -> Vec<Option<LineBreakData>>;
}
