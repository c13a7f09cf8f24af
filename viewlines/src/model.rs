//! Interfaces to the text model, plus an in-memory implementation.
//!
//! The projection table never stores text. It reads lines through
//! [`TextModel`], asks [`GuideSource`] for per-line guide data and
//! [`DecorationSource`] for decorations, always in model coordinates.

use crate::{
    coords::{ModelPosition, ModelRange},
    error::{OutOfRangeSnafu, Result},
    injected_text::LineInjectedText,
    settings::DEFAULT_TAB_SIZE,
};
use snafu::ensure;
use std::borrow::Cow;
use tracing::trace;

/// Read access to the stored text.
///
/// Lines and columns are 1-based; columns count `char`s.
pub trait TextModel {
    fn line_count(&self) -> u32;

    fn line_content(&self, line: u32) -> Cow<'_, str>;

    /// Monotonically increasing id of the current text.
    fn version_id(&self) -> u64;

    fn line_length(&self, line: u32) -> u32 {
        self.line_content(line).chars().count() as u32
    }

    fn line_min_column(&self, _line: u32) -> u32 {
        1
    }

    fn line_max_column(&self, line: u32) -> u32 {
        self.line_length(line) + 1
    }

    /// Text of `line` between two columns, end exclusive.
    fn value_in_line(&self, line: u32, start_column: u32, end_column: u32) -> String {
        let start = start_column.saturating_sub(1) as usize;
        let len = end_column.saturating_sub(start_column) as usize;
        self.line_content(line).chars().skip(start).take(len).collect()
    }

    fn validate_position(&self, position: ModelPosition) -> ModelPosition {
        let line = position.line.clamp(1, self.line_count().max(1));
        let column = position
            .column
            .clamp(self.line_min_column(line), self.line_max_column(line));
        ModelPosition::new(line, column)
    }

    fn validate_range(&self, range: ModelRange) -> ModelRange {
        let start = self.validate_position(range.start);
        let end = self.validate_position(range.end).max(start);
        ModelRange { start, end }
    }

    /// Injected text anchored on lines `start_line..=end_line`, sorted by
    /// position.
    fn injected_texts(&self, _start_line: u32, _end_line: u32) -> Vec<LineInjectedText> {
        Vec::new()
    }

    /// Column of the first non-whitespace character. For a line holding only
    /// whitespace this is the column just past it.
    fn line_indent_column(&self, line: u32) -> u32 {
        let indent = self
            .line_content(line)
            .chars()
            .take_while(|ch| matches!(ch, ' ' | '\t'))
            .count() as u32;
        indent + 1
    }
}

/// Horizontal segment of a bracket guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentGuideHorizontalLine {
    pub top: bool,
    pub end_column: u32,
}

/// One vertical guide drawn on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentGuide {
    pub visible_column: u32,
    pub class_name: String,
    pub horizontal_line: Option<IndentGuideHorizontalLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalGuides {
    #[default]
    Disabled,
    EnabledForActive,
    Enabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BracketGuideOptions {
    pub include_inactive: bool,
    pub horizontal_guides: HorizontalGuides,
    pub highlight_active: bool,
}

/// The indentation block around a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveIndentGuide {
    pub start_line: u32,
    pub end_line: u32,
    pub indent: u32,
}

/// Per-model-line guide data.
pub trait GuideSource {
    /// Indent level of every line in `start_line..=end_line`.
    fn lines_indent_guides(&self, start_line: u32, end_line: u32) -> Vec<u32>;

    /// Bracket guides of every line in `start_line..=end_line`.
    fn lines_bracket_guides(
        &self,
        start_line: u32,
        end_line: u32,
        active_position: Option<ModelPosition>,
        options: &BracketGuideOptions,
    ) -> Vec<Vec<IndentGuide>>;

    fn active_indent_guide(&self, line: u32, min_line: u32, max_line: u32) -> ActiveIndentGuide;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecorationId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDecoration {
    pub id: DecorationId,
    pub owner_id: u32,
    pub range: ModelRange,
    pub class_name: Option<String>,
    /// Validation decorations (errors, warnings) can be filtered out of queries.
    pub is_validation: bool,
}

/// Decoration storage queried in model coordinates.
pub trait DecorationSource {
    /// Decorations intersecting `range`. An `owner_id` of `None` matches every
    /// owner.
    fn decorations_in_range(
        &self,
        range: ModelRange,
        owner_id: Option<u32>,
        filter_out_validation: bool,
    ) -> Vec<ModelDecoration>;
}

/// An in-memory line buffer.
///
/// Every text edit bumps the version. Injected text follows line insertions
/// and deletions; decorations are not adjusted for edits.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    lines: Vec<String>,
    version: u64,
    tab_size: u32,
    injected: Vec<LineInjectedText>,
    decorations: Vec<ModelDecoration>,
    next_decoration: u64,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::from_text("")
    }
}

impl LineBuffer {
    /// Split `text` into lines on `\n`, dropping a trailing `\r` from each.
    pub fn from_text(text: &str) -> Self {
        Self::from_lines(text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line)))
    }

    /// Build from explicit lines. An empty list yields a single empty line.
    pub fn from_lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        let mut lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        if lines.is_empty() {
            lines.push(String::new());
        }
        Self {
            lines,
            version: 1,
            tab_size: DEFAULT_TAB_SIZE,
            injected: Vec::new(),
            decorations: Vec::new(),
            next_decoration: 1,
        }
    }

    pub fn with_tab_size(mut self, tab_size: u32) -> Self {
        self.tab_size = tab_size.max(1);
        self
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Insert `lines` so the first lands at line `at`.
    pub fn insert_lines<S: Into<String>>(
        &mut self,
        at: u32,
        lines: impl IntoIterator<Item = S>,
    ) -> Result<()> {
        let len = self.lines.len();
        let index = at.saturating_sub(1) as usize;
        ensure!(at >= 1 && index <= len, OutOfRangeSnafu { index, len });

        let new_lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let count = new_lines.len() as u32;
        self.lines.splice(index..index, new_lines);
        for text in &mut self.injected {
            if text.line >= at {
                text.line += count;
            }
        }
        self.version += 1;
        trace!(at, count, version = self.version, "inserted lines");
        Ok(())
    }

    /// Delete lines `from..=to`. At least one line must remain.
    pub fn delete_lines(&mut self, from: u32, to: u32) -> Result<()> {
        let len = self.lines.len();
        ensure!(
            from >= 1 && from <= to && (to as usize) <= len && ((to - from + 1) as usize) < len,
            OutOfRangeSnafu {
                index: to as usize,
                len,
            }
        );

        let count = to - from + 1;
        self.lines.drain(from as usize - 1..to as usize);
        self.injected.retain(|text| text.line < from || text.line > to);
        for text in &mut self.injected {
            if text.line > to {
                text.line -= count;
            }
        }
        self.version += 1;
        trace!(from, to, version = self.version, "deleted lines");
        Ok(())
    }

    pub fn set_line(&mut self, line: u32, text: impl Into<String>) -> Result<()> {
        let len = self.lines.len();
        let index = line.saturating_sub(1) as usize;
        ensure!(line >= 1 && index < len, OutOfRangeSnafu { index, len });

        self.lines[index] = text.into();
        self.version += 1;
        Ok(())
    }

    pub fn add_injected_text(&mut self, text: LineInjectedText) {
        self.injected.push(text);
        LineInjectedText::sort(&mut self.injected);
    }

    pub fn add_decoration(
        &mut self,
        owner_id: u32,
        range: ModelRange,
        class_name: Option<&str>,
        is_validation: bool,
    ) -> DecorationId {
        let id = DecorationId(self.next_decoration);
        self.next_decoration += 1;
        self.decorations.push(ModelDecoration {
            id,
            owner_id,
            range,
            class_name: class_name.map(str::to_string),
            is_validation,
        });
        id
    }

    fn line(&self, line: u32) -> &str {
        line.checked_sub(1)
            .and_then(|index| self.lines.get(index as usize))
            .map_or("", String::as_str)
    }

    /// Indent level of a line, `None` for blank lines.
    fn indent_level(&self, line: u32) -> Option<u32> {
        let text = self.line(line);
        if text.trim().is_empty() {
            return None;
        }
        let mut column = 0;
        for ch in text.chars() {
            match ch {
                ' ' => column += 1,
                '\t' => column += self.tab_size - column % self.tab_size,
                _ => break,
            }
        }
        Some(column / self.tab_size)
    }

    /// Indent level of a line, borrowing from its neighbors when blank.
    fn effective_indent_level(&self, line: u32) -> u32 {
        if let Some(level) = self.indent_level(line) {
            return level;
        }
        let above = (1..line).rev().find_map(|l| self.indent_level(l)).unwrap_or(0);
        let below = (line + 1..=self.line_count())
            .find_map(|l| self.indent_level(l))
            .unwrap_or(0);
        above.min(below)
    }
}

impl TextModel for LineBuffer {
    fn line_count(&self) -> u32 {
        self.lines.len() as u32
    }

    fn line_content(&self, line: u32) -> Cow<'_, str> {
        Cow::Borrowed(self.line(line))
    }

    fn version_id(&self) -> u64 {
        self.version
    }

    fn injected_texts(&self, start_line: u32, end_line: u32) -> Vec<LineInjectedText> {
        self.injected
            .iter()
            .filter(|text| start_line <= text.line && text.line <= end_line)
            .cloned()
            .collect()
    }
}

impl GuideSource for LineBuffer {
    fn lines_indent_guides(&self, start_line: u32, end_line: u32) -> Vec<u32> {
        (start_line..=end_line)
            .map(|line| self.effective_indent_level(line))
            .collect()
    }

    /// Plain text has no bracket pairs to guide.
    fn lines_bracket_guides(
        &self,
        start_line: u32,
        end_line: u32,
        _active_position: Option<ModelPosition>,
        _options: &BracketGuideOptions,
    ) -> Vec<Vec<IndentGuide>> {
        (start_line..=end_line).map(|_| Vec::new()).collect()
    }

    fn active_indent_guide(&self, line: u32, min_line: u32, max_line: u32) -> ActiveIndentGuide {
        let indent = self.effective_indent_level(line);
        if indent == 0 {
            return ActiveIndentGuide {
                start_line: line,
                end_line: line,
                indent: 0,
            };
        }

        let mut start = line;
        while start > min_line.max(1) && self.effective_indent_level(start - 1) >= indent {
            start -= 1;
        }
        let mut end = line;
        while end < max_line.min(self.line_count()) && self.effective_indent_level(end + 1) >= indent
        {
            end += 1;
        }

        ActiveIndentGuide {
            start_line: start.saturating_sub(1).max(1),
            end_line: end,
            indent,
        }
    }
}

impl DecorationSource for LineBuffer {
    fn decorations_in_range(
        &self,
        range: ModelRange,
        owner_id: Option<u32>,
        filter_out_validation: bool,
    ) -> Vec<ModelDecoration> {
        self.decorations
            .iter()
            .filter(|decoration| owner_id.map_or(true, |owner| decoration.owner_id == owner))
            .filter(|decoration| !(filter_out_validation && decoration.is_validation))
            .filter(|decoration| {
                decoration.range.start <= range.end && decoration.range.end >= range.start
            })
            .cloned()
            .collect()
    }
}
