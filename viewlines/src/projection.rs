//! How one model line maps onto view lines.
//!
//! ```text
//! Identity  model line -> 1 view line, columns unchanged
//! Hidden    model line -> 0 view lines (folded)
//! Wrapped   model line -> break_offsets.len() view lines, with injected text
//! ```
//!
//! A line with neither wraps nor injected text has no break data and is
//! Identity or Hidden. Content and column queries on a line that is not
//! visible fail with [`Error::Unsupported`](crate::Error::Unsupported).

use crate::{
    coords::{Affinity, ViewPosition},
    error::{Result, UnsupportedSnafu},
    injected_text::{apply_injections, InjectedTextOptions},
    line_break::LineBreakData,
    model::TextModel,
};
use snafu::ensure;
use std::sync::Arc;

/// An inline decoration covering `[start_offset, end_offset)` of a view line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDecoration {
    pub start_offset: u32,
    pub end_offset: u32,
    pub class_name: String,
    pub affects_letter_spacing: bool,
}

/// Everything a renderer needs for one view line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLineData {
    pub content: String,
    /// The next view line continues the same model line.
    pub continues_with_wrapped_line: bool,
    pub min_column: u32,
    pub max_column: u32,
    /// Visible column of the model line at which this row starts.
    pub start_visible_column: u32,
    pub inline_decorations: Vec<InlineDecoration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineProjection {
    Identity,
    Hidden,
    Wrapped {
        data: Arc<LineBreakData>,
        visible: bool,
    },
}

impl LineProjection {
    pub fn new(data: Option<Arc<LineBreakData>>, visible: bool) -> Self {
        match (data, visible) {
            (Some(data), visible) => Self::Wrapped { data, visible },
            (None, true) => Self::Identity,
            (None, false) => Self::Hidden,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self {
            Self::Identity => true,
            Self::Hidden => false,
            Self::Wrapped { visible, .. } => *visible,
        }
    }

    /// Toggle visibility. Identity and Hidden swap, Wrapped flips its flag.
    pub fn set_visible(self, visible: bool) -> Self {
        match self {
            Self::Identity | Self::Hidden => Self::new(None, visible),
            Self::Wrapped { data, .. } => Self::Wrapped { data, visible },
        }
    }

    pub fn line_break_data(&self) -> Option<&Arc<LineBreakData>> {
        match self {
            Self::Wrapped { data, .. } => Some(data),
            Self::Identity | Self::Hidden => None,
        }
    }

    pub fn view_line_count(&self) -> u32 {
        match self {
            Self::Identity => 1,
            Self::Hidden => 0,
            Self::Wrapped { visible: false, .. } => 0,
            Self::Wrapped { data, .. } => data.output_line_count() as u32,
        }
    }

    fn visible_data(&self, operation: &'static str) -> Result<Option<&LineBreakData>> {
        ensure!(self.is_visible(), UnsupportedSnafu { operation });
        Ok(self.line_break_data().map(|data| &**data))
    }

    pub fn content<M: TextModel + ?Sized>(
        &self,
        model: &M,
        line: u32,
        row: usize,
    ) -> Result<String> {
        let Some(data) = self.visible_data("content")? else {
            return Ok(model.line_content(line).into_owned());
        };

        let (start, end) = data.row_range(row);
        let text = if data.has_injections() {
            let unwrapped = apply_injections(&model.line_content(line), &data.injections);
            unwrapped
                .chars()
                .skip(start as usize)
                .take(end.saturating_sub(start) as usize)
                .collect()
        } else {
            model.value_in_line(line, start + 1, end + 1)
        };

        if row > 0 {
            let indent = data.wrapped_text_indent_length as usize;
            Ok(format!("{:indent$}{text}", ""))
        } else {
            Ok(text)
        }
    }

    pub fn length<M: TextModel + ?Sized>(&self, model: &M, line: u32, row: usize) -> Result<u32> {
        match self.visible_data("length")? {
            Some(data) => Ok(data.line_length(row)),
            None => Ok(model.line_length(line)),
        }
    }

    pub fn min_column<M: TextModel + ?Sized>(
        &self,
        model: &M,
        line: u32,
        row: usize,
    ) -> Result<u32> {
        match self.visible_data("min column")? {
            Some(data) => Ok(data.min_column(row)),
            None => Ok(model.line_min_column(line)),
        }
    }

    pub fn max_column<M: TextModel + ?Sized>(
        &self,
        model: &M,
        line: u32,
        row: usize,
    ) -> Result<u32> {
        match self.visible_data("max column")? {
            Some(data) => Ok(data.max_column(row)),
            None => Ok(model.line_max_column(line)),
        }
    }

    pub fn view_line_data<M: TextModel + ?Sized>(
        &self,
        model: &M,
        line: u32,
        row: usize,
    ) -> Result<ViewLineData> {
        let Some(data) = self.visible_data("view line data")? else {
            return Ok(ViewLineData {
                content: model.line_content(line).into_owned(),
                continues_with_wrapped_line: false,
                min_column: model.line_min_column(line),
                max_column: model.line_max_column(line),
                start_visible_column: 0,
                inline_decorations: Vec::new(),
            });
        };

        let content = self.content(model, line, row)?;
        let indent = if row > 0 {
            data.wrapped_text_indent_length
        } else {
            0
        };
        let (row_start, row_end) = data.row_range(row);

        let mut inline_decorations = Vec::new();
        let mut injected_before = 0;
        for injection in &data.injections {
            let len = injection.options.len();
            let start = injection.offset + injected_before;
            let end = start + len;
            injected_before += len;
            if start > row_end {
                break;
            }
            if row_start >= end {
                continue;
            }
            let Some(class_name) = &injection.options.inline_class_name else {
                continue;
            };
            let start_offset = indent + start.saturating_sub(row_start);
            let end_offset = indent + end.min(row_end) - row_start;
            if start_offset != end_offset {
                inline_decorations.push(InlineDecoration {
                    start_offset,
                    end_offset,
                    class_name: class_name.clone(),
                    affects_letter_spacing: injection.options.affects_letter_spacing,
                });
            }
        }

        Ok(ViewLineData {
            max_column: content.chars().count() as u32 + 1,
            content,
            continues_with_wrapped_line: row + 1 < data.output_line_count(),
            min_column: data.min_column(row),
            start_visible_column: data.start_visible_column(row),
            inline_decorations,
        })
    }

    /// Model column shown at `view_column` of `row`.
    pub fn model_column_of_view_position(&self, row: usize, view_column: u32) -> Result<u32> {
        match self.visible_data("model column")? {
            None => Ok(view_column),
            Some(data) => {
                let indent = if row > 0 {
                    data.wrapped_text_indent_length
                } else {
                    0
                };
                let offset = view_column.saturating_sub(1).saturating_sub(indent);
                Ok(data.input_offset_of(row, offset) + 1)
            },
        }
    }

    /// View position of `model_column`, with rows counted from `base_line`.
    pub fn view_position_of_model_position(
        &self,
        base_line: u32,
        model_column: u32,
        affinity: Affinity,
    ) -> Result<ViewPosition> {
        match self.visible_data("view position")? {
            None => Ok(ViewPosition::new(base_line, model_column)),
            Some(data) => {
                let output = data.output_position_of(model_column.saturating_sub(1), affinity);
                Ok(ViewPosition::new(
                    base_line + output.row as u32,
                    data.view_column_of(output),
                ))
            },
        }
    }

    pub fn view_line_number_of_model_position(
        &self,
        base_line: u32,
        model_column: u32,
    ) -> Result<u32> {
        match self.visible_data("view line number")? {
            None => Ok(base_line),
            Some(data) => {
                let output =
                    data.output_position_of(model_column.saturating_sub(1), Affinity::None);
                Ok(base_line + output.row as u32)
            },
        }
    }

    /// Move `position`, which lies on `row`, out of injected text or across a
    /// wrap boundary per `affinity`.
    pub fn normalize_position(
        &self,
        row: usize,
        position: ViewPosition,
        affinity: Affinity,
    ) -> Result<ViewPosition> {
        match self.visible_data("normalize position")? {
            None => Ok(position),
            Some(data) => {
                let base_line = position.line - row as u32;
                let output = data.normalize_output_position(row, position.column, affinity);
                Ok(ViewPosition::new(
                    base_line + output.row as u32,
                    data.view_column_of(output),
                ))
            },
        }
    }

    pub fn injected_text_at(&self, row: usize, view_column: u32) -> Option<&InjectedTextOptions> {
        if !self.is_visible() {
            return None;
        }
        self.line_break_data()
            .and_then(|data| data.injected_text_at(row, view_column))
    }
}
