//! Indent and bracket guides in view space.
//!
//! The [`GuideSource`] answers per model line. [`GuideProjector`] asks it once
//! per run of visible model lines and spreads each answer over the view lines
//! the model line owns:
//!
//! ```text
//! model 2  "    call(a, b)"    indent 1    view 2  "    call("   1
//!                                          view 3  "a, b)"       0  continuation at column 1
//! model 3  (hidden)
//! model 4  "}"                 indent 0    view 4  "}"           0
//! ```
//!
//! A continuation row that starts at column 1 has no visual indentation, so
//! indent guides are blocked on it.

use crate::{
    coords::{Affinity, ModelPosition, ViewPosition},
    model::{ActiveIndentGuide, BracketGuideOptions, GuideSource, IndentGuide, TextModel},
    projection::LineProjection,
    table::{ProjectionTable, ViewLineInfo},
};
use tracing::trace;

/// How an indent value repeats over the view lines of one model line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepeatPolicy {
    /// Every row shows the guide.
    BlockNone,
    /// Only the first row shows the guide.
    BlockSubsequent,
    /// No row shows the guide.
    BlockAll,
}

impl RepeatPolicy {
    /// Index of the first row whose guide is blocked.
    fn blocked_from(self, count: usize) -> usize {
        match self {
            RepeatPolicy::BlockNone => count,
            RepeatPolicy::BlockSubsequent => 1,
            RepeatPolicy::BlockAll => 0,
        }
    }
}

pub struct GuideProjector<'a, M> {
    table: &'a ProjectionTable<M>,
}

impl<M: TextModel + GuideSource> ProjectionTable<M> {
    pub fn guides(&self) -> GuideProjector<'_, M> {
        GuideProjector::new(self)
    }
}

impl<'a, M: TextModel + GuideSource> GuideProjector<'a, M> {
    pub fn new(table: &'a ProjectionTable<M>) -> Self {
        Self { table }
    }

    fn clamp(&self, view_line: u32) -> u32 {
        view_line.clamp(1, self.table.view_line_count().max(1))
    }

    fn view_line_start(&self, view_line: u32) -> ModelPosition {
        let info = self.table.view_line_info(view_line);
        let column = self.table.info_min_column(info);
        self.table.view_to_model(ViewPosition::new(view_line, column))
    }

    fn view_line_end(&self, view_line: u32) -> ModelPosition {
        let info = self.table.view_line_info(view_line);
        let column = self.table.info_max_column(info);
        self.table.view_to_model(ViewPosition::new(view_line, column))
    }

    /// Indent level for every view line in `start..=end`.
    pub fn indent_guides(&self, start: u32, end: u32) -> Vec<u32> {
        let start = self.clamp(start);
        let end = self.clamp(end);
        if end < start {
            return Vec::new();
        }
        let model = self.table.model();
        let model_start = self.view_line_start(start);
        let model_end = self.view_line_end(end);

        let mut shapes = Vec::new();
        for line in model_start.line..=model_end.line {
            let Some(projection) = self.table.projection(line) else {
                break;
            };
            if !projection.is_visible() {
                continue;
            }
            let first_column = if line == model_start.line {
                model_start.column
            } else {
                1
            };
            shapes.push(self.line_shape(projection, line, first_column));
        }

        let runs = self
            .table
            .visible_model_ranges(model_start, model_end, model_start.column);
        let values = runs
            .iter()
            .flat_map(|run| model.lines_indent_guides(run.start.line, run.end.line));

        let wanted = (end - start + 1) as usize;
        let mut result = Vec::with_capacity(wanted);
        for (value, (count, policy)) in values.zip(shapes) {
            let count = count.min(wanted - result.len());
            let blocked_from = policy.blocked_from(count);
            result.extend((0..count).map(|row| if row < blocked_from { value } else { 0 }));
        }
        result.resize(wanted, 0);
        trace!(start, end, runs = runs.len(), "projected indent guides");
        result
    }

    /// View rows of `line` from `first_column` on, and how its guide repeats.
    fn line_shape(
        &self,
        projection: &LineProjection,
        line: u32,
        first_column: u32,
    ) -> (usize, RepeatPolicy) {
        let model = self.table.model();
        let row_of = |column: u32| {
            projection
                .view_line_number_of_model_position(0, column)
                .unwrap_or(0) as usize
        };
        let first_row = row_of(first_column);
        let last_row = row_of(model.line_max_column(line));
        let count = last_row.saturating_sub(first_row) + 1;

        let unindented = projection
            .min_column(model, line, last_row)
            .is_ok_and(|column| column == 1);
        let policy = match (count > 1 && unindented, first_row) {
            (false, _) => RepeatPolicy::BlockNone,
            (true, 0) => RepeatPolicy::BlockSubsequent,
            (true, _) => RepeatPolicy::BlockAll,
        };
        (count, policy)
    }

    /// Bracket guides for every view line in `start..=end`.
    ///
    /// Horizontal guide end columns come back as view columns.
    pub fn bracket_guides(
        &self,
        start: u32,
        end: u32,
        active_position: Option<ViewPosition>,
        options: &BracketGuideOptions,
    ) -> Vec<Vec<IndentGuide>> {
        let start = self.clamp(start);
        let end = self.clamp(end);
        let active = active_position.map(|position| self.table.view_to_model(position));

        let mut result = Vec::new();
        for (range, view_lines) in self.table.view_lines_grouped_by_model_ranges(start, end) {
            let per_line = self.table.model().lines_bracket_guides(
                range.start.line,
                range.end.line,
                active,
                options,
            );
            for info in view_lines {
                result.push(self.bracket_guides_of(info, range.start.line, &per_line));
            }
        }
        result
    }

    fn bracket_guides_of(
        &self,
        info: ViewLineInfo,
        first_line: u32,
        per_line: &[Vec<IndentGuide>],
    ) -> Vec<IndentGuide> {
        if info.is_wrapped_continuation() && self.table.info_min_column(info) == 1 {
            return Vec::new();
        }
        let Some(guides) = per_line.get((info.model_line - first_line) as usize) else {
            return Vec::new();
        };

        guides
            .iter()
            .map(|guide| {
                let mut guide = guide.clone();
                if let Some(horizontal) = &mut guide.horizontal_line {
                    let position = ModelPosition::new(info.model_line, horizontal.end_column);
                    horizontal.end_column =
                        self.table.model_to_view(position, Affinity::None).column;
                }
                guide
            })
            .collect()
    }

    /// The indentation block around `view_line`, searched within
    /// `min_line..=max_line`, in view lines.
    pub fn active_indent_guide(
        &self,
        view_line: u32,
        min_line: u32,
        max_line: u32,
    ) -> ActiveIndentGuide {
        let line = self.view_line_start(self.clamp(view_line)).line;
        let min = self.view_line_start(self.clamp(min_line)).line;
        let max = self.view_line_start(self.clamp(max_line)).line;

        let model = self.table.model();
        let guide = model.active_indent_guide(line, min, max);

        let start = self
            .table
            .model_to_view(ModelPosition::new(guide.start_line, 1), Affinity::None);
        let end_column = model.line_max_column(guide.end_line);
        let end = self
            .table
            .model_to_view(ModelPosition::new(guide.end_line, end_column), Affinity::None);

        ActiveIndentGuide {
            start_line: start.line,
            end_line: end.line,
            indent: guide.indent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        coords::LineRange,
        model::{IndentGuideHorizontalLine, LineBuffer},
        settings::{WrapSettings, WrappingIndent},
    };
    use std::borrow::Cow;

    fn wrapped(text: &str, column: u32, indent: WrappingIndent) -> ProjectionTable<LineBuffer> {
        let settings = WrapSettings {
            wrapping_indent: indent,
            ..WrapSettings::wrapped_at(column)
        };
        ProjectionTable::new(LineBuffer::from_text(text), settings, 4)
    }

    /// A buffer whose every line carries one bracket guide.
    struct Bracketed {
        buffer: LineBuffer,
        end_column: u32,
    }

    impl TextModel for Bracketed {
        fn line_count(&self) -> u32 {
            self.buffer.line_count()
        }

        fn line_content(&self, line: u32) -> Cow<'_, str> {
            self.buffer.line_content(line)
        }

        fn version_id(&self) -> u64 {
            self.buffer.version_id()
        }
    }

    impl GuideSource for Bracketed {
        fn lines_indent_guides(&self, start_line: u32, end_line: u32) -> Vec<u32> {
            self.buffer.lines_indent_guides(start_line, end_line)
        }

        fn lines_bracket_guides(
            &self,
            start_line: u32,
            end_line: u32,
            _active_position: Option<ModelPosition>,
            _options: &BracketGuideOptions,
        ) -> Vec<Vec<IndentGuide>> {
            (start_line..=end_line)
                .map(|_| {
                    vec![IndentGuide {
                        visible_column: 0,
                        class_name: "bracket".into(),
                        horizontal_line: Some(IndentGuideHorizontalLine {
                            top: true,
                            end_column: self.end_column,
                        }),
                    }]
                })
                .collect()
        }

        fn active_indent_guide(&self, line: u32, min_line: u32, max_line: u32) -> ActiveIndentGuide {
            self.buffer.active_indent_guide(line, min_line, max_line)
        }
    }

    const BLOCK: &str = "fn a() {\n    xxxxxxxx yyyyyyyy\n}";

    #[test]
    fn unindented_continuations_block_guides() {
        let table = wrapped(BLOCK, 14, WrappingIndent::None);
        assert_eq!(table.view_line_count(), 4);
        assert_eq!(table.guides().indent_guides(1, 4), vec![0, 1, 0, 0]);
    }

    #[test]
    fn starting_on_unindented_continuation_blocks_all_rows() {
        let table = wrapped(
            "fn a() {\n    xxxxxxxx yyyyyyyy zzzzzzzz\n}",
            14,
            WrappingIndent::None,
        );
        assert_eq!(table.view_line_count(), 5);
        assert_eq!(table.guides().indent_guides(3, 4), vec![0, 0]);
    }

    #[test]
    fn indented_continuations_repeat_guides() {
        let table = wrapped(BLOCK, 14, WrappingIndent::Same);
        assert_eq!(table.view_line_count(), 4);
        assert_eq!(table.view_line_min_column(3), Ok(5));
        assert_eq!(table.guides().indent_guides(1, 4), vec![0, 1, 1, 0]);
        assert_eq!(table.guides().indent_guides(3, 4), vec![1, 0]);
    }

    #[test]
    fn folded_lines_are_skipped() {
        let mut table = wrapped("a\n    b\n    c\nd", 80, WrappingIndent::None);
        table.set_hidden_areas(&[LineRange::new(2, 2)]).unwrap();
        assert_eq!(table.guides().indent_guides(1, 3), vec![0, 1, 0]);
        assert_eq!(table.guides().indent_guides(0, 99), vec![0, 1, 0]);
    }

    #[test]
    fn active_guide_in_view_lines() {
        let mut table = wrapped("fn a() {\n    x\n\n    y\n}", 80, WrappingIndent::None);
        assert_eq!(
            table.guides().active_indent_guide(3, 1, 5),
            ActiveIndentGuide {
                start_line: 1,
                end_line: 4,
                indent: 1,
            }
        );

        table.set_hidden_areas(&[LineRange::new(3, 3)]).unwrap();
        assert_eq!(
            table.guides().active_indent_guide(3, 1, 4),
            ActiveIndentGuide {
                start_line: 1,
                end_line: 3,
                indent: 1,
            }
        );
    }

    #[test]
    fn bracket_guides_follow_rows() {
        let model = Bracketed {
            buffer: LineBuffer::from_text("let value = call(argument);"),
            end_column: 14,
        };
        let settings = WrapSettings {
            wrapping_indent: WrappingIndent::None,
            ..WrapSettings::wrapped_at(12)
        };
        let table = ProjectionTable::new(model, settings, 4);
        assert_eq!(table.view_line_count(), 3);

        let guides = table
            .guides()
            .bracket_guides(1, 3, None, &BracketGuideOptions::default());
        assert_eq!(guides.len(), 3);
        assert_eq!(
            guides[0][0].horizontal_line,
            Some(IndentGuideHorizontalLine {
                top: true,
                end_column: 2,
            })
        );
        assert!(guides[1].is_empty());
        assert!(guides[2].is_empty());
    }

    #[test]
    fn bracket_guides_across_folds() {
        let model = Bracketed {
            buffer: LineBuffer::from_text("a\nb\nc\nd"),
            end_column: 2,
        };
        let mut table = ProjectionTable::new(model, WrapSettings::default(), 4);
        table.set_hidden_areas(&[LineRange::new(2, 3)]).unwrap();

        let guides = table.guides().bracket_guides(
            1,
            2,
            Some(ViewPosition::new(2, 1)),
            &BracketGuideOptions::default(),
        );
        assert_eq!(guides.len(), 2);
        assert!(guides.iter().all(|line| line.len() == 1));
    }
}
