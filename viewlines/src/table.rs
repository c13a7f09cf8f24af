//! The projection table: one [`LineProjection`] per model line.
//!
//! [`ProjectionTable`] owns the text model together with the projections and a
//! [`PrefixSumIndex`] over their view line counts. It is the only place that
//! translates between model and view coordinates.
//!
//! # Updates
//!
//! Structural updates mirror edits to the model and carry the model version
//! they were computed against. The table remembers the last version it fully
//! incorporated ([`accept_version`](ProjectionTable::accept_version)) and
//! ignores any update at or below it, returning `Ok(None)`.
//!
//! ```ignore
//! table.model_mut().insert_lines(2, ["a", "b"])?;
//! let version = table.model().version_id();
//! let breaks = table.compute_line_breaks(2, 3);
//! let inserted = table.apply_lines_inserted(version, 2, breaks)?;
//! table.accept_version(version)?;
//! ```
//!
//! # Queries
//!
//! View line numbers passed to queries are clamped to `1..=view_line_count()`
//! and model positions are validated against the model, so conversions never
//! fail.

use crate::{
    coords::{Affinity, LineRange, ModelPosition, ModelRange, ViewPosition, ViewRange},
    error::{OutOfRangeSnafu, Result},
    events::{LineMappingChange, ViewLinesChanged, ViewLinesDeleted, ViewLinesInserted},
    folding::HiddenAreas,
    injected_text::{InjectedTextOptions, Injection},
    line_break::{LineBreakData, LineBreakRequest, LineBreaksComputer},
    model::TextModel,
    monospace::MonospaceLineBreaksComputer,
    prefix_sum::PrefixSumIndex,
    projection::{LineProjection, ViewLineData},
    settings::{WrapSettings, WrappingStrategy},
};
use snafu::ensure;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// The model line and wrapped row owning a view line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLineInfo {
    pub model_line: u32,
    /// 0-based wrapped row within the model line.
    pub row: usize,
}

impl ViewLineInfo {
    pub fn is_wrapped_continuation(&self) -> bool {
        self.row > 0
    }
}

pub struct ProjectionTable<M> {
    model: M,
    projections: Vec<LineProjection>,
    line_counts: PrefixSumIndex,
    hidden_areas: HiddenAreas,
    /// Last model version fully incorporated.
    valid_version: Option<u64>,
    settings: WrapSettings,
    tab_size: u32,
    simple_computer: Box<dyn LineBreaksComputer>,
    advanced_computer: Option<Box<dyn LineBreaksComputer>>,
}

impl<M: TextModel> ProjectionTable<M> {
    /// Build a table using monospace line breaking.
    pub fn new(model: M, settings: WrapSettings, tab_size: u32) -> Self {
        Self::with_computer(
            model,
            settings,
            tab_size,
            Box::new(MonospaceLineBreaksComputer::new()),
        )
    }

    pub fn with_computer(
        model: M,
        settings: WrapSettings,
        tab_size: u32,
        computer: Box<dyn LineBreaksComputer>,
    ) -> Self {
        let mut table = Self {
            model,
            projections: Vec::new(),
            line_counts: PrefixSumIndex::new(),
            hidden_areas: HiddenAreas::default(),
            valid_version: None,
            settings,
            tab_size: tab_size.max(1),
            simple_computer: computer,
            advanced_computer: None,
        };
        table.construct_lines(true, None);
        table
    }

    /// Computer used for [`WrappingStrategy::Advanced`]. Without one, the
    /// simple computer handles both strategies.
    pub fn set_advanced_computer(&mut self, computer: Box<dyn LineBreaksComputer>) {
        self.advanced_computer = Some(computer);
        if self.settings.strategy == WrappingStrategy::Advanced {
            self.construct_lines(false, None);
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the model. Edits must be reported back through the
    /// `apply_*` methods, or followed by [`rebuild_all`](Self::rebuild_all).
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn wrap_settings(&self) -> &WrapSettings {
        &self.settings
    }

    pub fn tab_size(&self) -> u32 {
        self.tab_size
    }

    pub fn valid_version(&self) -> Option<u64> {
        self.valid_version
    }

    fn computer(&self) -> &dyn LineBreaksComputer {
        match (self.settings.strategy, &self.advanced_computer) {
            (WrappingStrategy::Advanced, Some(computer)) => computer.as_ref(),
            _ => self.simple_computer.as_ref(),
        }
    }

    fn requests(
        &self,
        from: u32,
        to: u32,
        previous: Option<&[Option<Arc<LineBreakData>>]>,
    ) -> Vec<LineBreakRequest> {
        if to < from {
            return Vec::new();
        }
        let mut injected = self.model.injected_texts(from, to).into_iter().peekable();

        (from..=to)
            .map(|line| {
                let mut injections = Vec::new();
                while let Some(text) = injected.next_if(|text| text.line <= line) {
                    if text.line == line {
                        injections.push(Injection::from(text));
                    }
                }
                LineBreakRequest {
                    text: self.model.line_content(line).into_owned(),
                    injections,
                    previous: previous
                        .and_then(|previous| previous.get((line - from) as usize))
                        .cloned()
                        .flatten(),
                }
            })
            .collect()
    }

    /// Compute break data for model lines `from..=to` under the current
    /// settings, ready for [`apply_lines_inserted`](Self::apply_lines_inserted)
    /// or [`apply_line_changed`](Self::apply_line_changed).
    pub fn compute_line_breaks(&self, from: u32, to: u32) -> Vec<Option<LineBreakData>> {
        let requests = self.requests(from, to, None);
        self.computer()
            .compute(&self.settings, self.tab_size, requests)
    }

    fn construct_lines(
        &mut self,
        reset_hidden_areas: bool,
        previous: Option<Vec<Option<Arc<LineBreakData>>>>,
    ) {
        let line_count = self.model.line_count();
        self.hidden_areas = if reset_hidden_areas {
            HiddenAreas::default()
        } else {
            self.hidden_areas.revalidated(line_count)
        };

        let requests = self.requests(1, line_count, previous.as_deref());
        let mut breaks = self
            .computer()
            .compute(&self.settings, self.tab_size, requests)
            .into_iter();

        self.projections = (1..=line_count)
            .map(|line| {
                let data = breaks.next().flatten().map(Arc::new);
                LineProjection::new(data, !self.hidden_areas.contains(line))
            })
            .collect();
        self.line_counts =
            PrefixSumIndex::from_weights(self.projections.iter().map(LineProjection::view_line_count));
        self.valid_version = Some(self.model.version_id());
        debug!(
            lines = line_count,
            view_lines = self.line_counts.total_sum(),
            "constructed projections"
        );

        if line_count > 0 && self.line_counts.total_sum() == 0 {
            warn!("every line was hidden, revealing all lines");
            self.reveal_all();
        }
    }

    /// Recompute every projection from the model.
    ///
    /// With `reset_folding` false the current hidden areas are kept, clamped to
    /// the new line count.
    pub fn rebuild_all(&mut self, reset_folding: bool) {
        self.construct_lines(reset_folding, None);
    }

    /// Returns false when `settings` equals the current settings.
    pub fn set_wrap_settings(&mut self, settings: WrapSettings) -> bool {
        if self.settings == settings {
            return false;
        }

        let previous = self.settings.only_column_differs(&settings).then(|| {
            self.projections
                .iter()
                .map(|projection| projection.line_break_data().cloned())
                .collect::<Vec<_>>()
        });
        self.settings = settings;
        self.construct_lines(false, previous);
        true
    }

    /// Returns false when `tab_size` equals the current tab size.
    pub fn set_tab_size(&mut self, tab_size: u32) -> bool {
        let tab_size = tab_size.max(1);
        if self.tab_size == tab_size {
            return false;
        }
        self.tab_size = tab_size;
        self.construct_lines(false, None);
        true
    }

    pub fn hidden_areas(&self) -> &[LineRange] {
        self.hidden_areas.ranges()
    }

    pub(crate) fn hides_any_line_in(&self, start: u32, end: u32) -> bool {
        self.hidden_areas.intersects(start, end)
    }

    /// Replace the hidden areas.
    ///
    /// Returns false when the normalized ranges equal the current ones. A set
    /// of ranges hiding every line is replaced by no hidden areas at all.
    pub fn set_hidden_areas(&mut self, ranges: &[LineRange]) -> Result<bool> {
        let line_count = self.projections.len() as u32;
        let hidden_areas = HiddenAreas::normalize(ranges, line_count);
        if hidden_areas == self.hidden_areas {
            return Ok(false);
        }
        self.hidden_areas = hidden_areas;

        let mut has_visible_line = false;
        let mut toggled = 0;
        for (index, projection) in self.projections.iter_mut().enumerate() {
            let hidden = self.hidden_areas.contains(index as u32 + 1);
            has_visible_line |= !hidden;
            if projection.is_visible() != hidden {
                continue;
            }

            let updated = std::mem::replace(projection, LineProjection::Hidden).set_visible(!hidden);
            self.line_counts.set_value(index, updated.view_line_count())?;
            *projection = updated;
            toggled += 1;
        }
        debug!(
            areas = self.hidden_areas.ranges().len(),
            toggled, "updated hidden areas"
        );

        if line_count > 0 && !has_visible_line {
            warn!("hidden areas cover every line, revealing all lines");
            self.set_hidden_areas(&[])?;
        }
        Ok(true)
    }

    fn reveal_all(&mut self) {
        self.hidden_areas = HiddenAreas::default();
        for projection in &mut self.projections {
            if !projection.is_visible() {
                *projection = std::mem::replace(projection, LineProjection::Hidden).set_visible(true);
            }
        }
        self.line_counts =
            PrefixSumIndex::from_weights(self.projections.iter().map(LineProjection::view_line_count));
    }

    fn is_stale(&self, version: u64) -> bool {
        self.valid_version.is_some_and(|valid| version <= valid)
    }

    /// First view line of model line `index + 1`, whether or not it is visible.
    fn view_line_base(&self, index: usize) -> Result<u32> {
        Ok(self.line_counts.prefix_sum(index)? + 1)
    }

    fn check_model_lines(&self, from: u32, to: u32) -> Result<()> {
        let len = self.projections.len();
        ensure!(
            from >= 1 && from <= to && to as usize <= len,
            OutOfRangeSnafu {
                index: to as usize,
                len,
            }
        );
        Ok(())
    }

    /// Remove the projections of deleted model lines `from..=to`.
    pub fn apply_lines_deleted(
        &mut self,
        version: u64,
        from: u32,
        to: u32,
    ) -> Result<Option<ViewLinesDeleted>> {
        if self.is_stale(version) {
            debug!(version, valid = ?self.valid_version, "ignoring stale line deletion");
            return Ok(None);
        }
        self.check_model_lines(from, to)?;

        let start = from as usize - 1;
        let count = (to - from + 1) as usize;
        let view_from = self.view_line_base(start)?;
        let view_to = self.line_counts.prefix_sum(start + count)?;

        self.projections.drain(start..start + count);
        self.line_counts.remove_values(start, count)?;
        self.hidden_areas.on_lines_deleted(from, to);

        trace!(from, to, view_from, view_to, "deleted model lines");
        Ok(Some(ViewLinesDeleted::new(view_from, view_to)))
    }

    /// Insert projections for new model lines starting at `from`, one per entry
    /// of `line_breaks`.
    ///
    /// New lines directly after a hidden line are hidden too.
    pub fn apply_lines_inserted(
        &mut self,
        version: u64,
        from: u32,
        line_breaks: Vec<Option<LineBreakData>>,
    ) -> Result<Option<ViewLinesInserted>> {
        if self.is_stale(version) {
            debug!(version, valid = ?self.valid_version, "ignoring stale line insertion");
            return Ok(None);
        }
        let len = self.projections.len();
        let start = from.saturating_sub(1) as usize;
        ensure!(
            from >= 1 && start <= len,
            OutOfRangeSnafu { index: start, len }
        );

        let hidden = start > 0 && !self.projections[start - 1].is_visible();
        let view_from = self.view_line_base(start)?;

        let inserted: Vec<LineProjection> = line_breaks
            .into_iter()
            .map(|data| LineProjection::new(data.map(Arc::new), !hidden))
            .collect();
        let counts: Vec<u32> = inserted.iter().map(LineProjection::view_line_count).collect();
        let total: u32 = counts.iter().sum();
        let count = inserted.len() as u32;

        self.projections.splice(start..start, inserted);
        self.line_counts.insert_values(start, &counts)?;
        self.hidden_areas.on_lines_inserted(from, count);

        trace!(from, count, hidden, "inserted model lines");
        Ok(Some(ViewLinesInserted::new(view_from, view_from + total - 1)))
    }

    /// Replace the projection of a changed model line, keeping its visibility.
    ///
    /// A `None` version is never stale.
    pub fn apply_line_changed(
        &mut self,
        version: Option<u64>,
        line: u32,
        line_break: Option<LineBreakData>,
    ) -> Result<Option<LineMappingChange>> {
        if let Some(version) = version.filter(|&version| self.is_stale(version)) {
            debug!(version, valid = ?self.valid_version, "ignoring stale line change");
            return Ok(None);
        }
        self.check_model_lines(line, line)?;

        let index = line as usize - 1;
        let old_count = self.projections[index].view_line_count();
        let projection =
            LineProjection::new(line_break.map(Arc::new), self.projections[index].is_visible());
        let new_count = projection.view_line_count();
        self.projections[index] = projection;

        let view_from = self.view_line_base(index)?;
        let unchanged = old_count.min(new_count);
        let changed = (unchanged > 0).then(|| ViewLinesChanged::new(view_from, view_from + unchanged - 1));
        let grown_from = view_from + unchanged;
        let inserted = (new_count > old_count)
            .then(|| ViewLinesInserted::new(grown_from, grown_from + new_count - old_count - 1));
        let deleted = (old_count > new_count)
            .then(|| ViewLinesDeleted::new(grown_from, grown_from + old_count - new_count - 1));

        self.line_counts.set_value(index, new_count)?;

        Ok(Some(LineMappingChange {
            mapping_changed: old_count != new_count,
            changed,
            inserted,
            deleted,
        }))
    }

    /// Mark `version` as fully incorporated.
    ///
    /// Reveals every line if the edits left the view without a visible line.
    pub fn accept_version(&mut self, version: u64) -> Result<()> {
        self.valid_version = Some(version);
        if !self.projections.is_empty() && self.line_counts.total_sum() == 0 {
            warn!(version, "no visible line left, resetting hidden areas");
            self.set_hidden_areas(&[])?;
            if self.line_counts.total_sum() == 0 {
                self.reveal_all();
            }
        }
        Ok(())
    }

    pub fn view_line_count(&self) -> u32 {
        self.line_counts.total_sum()
    }

    /// Total view lines, computed from the projections rather than the index.
    #[cfg(test)]
    pub(crate) fn projected_line_count(&self) -> u32 {
        self.projections.iter().map(LineProjection::view_line_count).sum()
    }

    fn valid_view_line(&self, view_line: u32) -> u32 {
        view_line.clamp(1, self.view_line_count().max(1))
    }

    /// The model line and row owning `view_line`, after clamping it.
    pub fn view_line_info(&self, view_line: u32) -> ViewLineInfo {
        let view_line = self.valid_view_line(view_line);
        match self.line_counts.index_of(view_line - 1) {
            Ok((index, row)) => ViewLineInfo {
                model_line: index as u32 + 1,
                row: row as usize,
            },
            Err(err) => {
                warn!(%err, view_line, "view line lookup on an empty view");
                ViewLineInfo {
                    model_line: 1,
                    row: 0,
                }
            },
        }
    }

    pub(crate) fn projection(&self, model_line: u32) -> Option<&LineProjection> {
        model_line
            .checked_sub(1)
            .and_then(|index| self.projections.get(index as usize))
    }

    fn owner(&self, info: ViewLineInfo) -> Result<&LineProjection> {
        let len = self.projections.len();
        self.projection(info.model_line).ok_or_else(|| {
            OutOfRangeSnafu {
                index: info.model_line as usize,
                len,
            }
            .build()
        })
    }

    pub fn view_line_content(&self, view_line: u32) -> Result<String> {
        let info = self.view_line_info(view_line);
        self.owner(info)?.content(&self.model, info.model_line, info.row)
    }

    pub fn view_line_length(&self, view_line: u32) -> Result<u32> {
        let info = self.view_line_info(view_line);
        self.owner(info)?.length(&self.model, info.model_line, info.row)
    }

    pub fn view_line_min_column(&self, view_line: u32) -> Result<u32> {
        let info = self.view_line_info(view_line);
        self.owner(info)?.min_column(&self.model, info.model_line, info.row)
    }

    pub fn view_line_max_column(&self, view_line: u32) -> Result<u32> {
        let info = self.view_line_info(view_line);
        self.owner(info)?.max_column(&self.model, info.model_line, info.row)
    }

    pub(crate) fn info_min_column(&self, info: ViewLineInfo) -> u32 {
        self.owner(info)
            .and_then(|projection| projection.min_column(&self.model, info.model_line, info.row))
            .unwrap_or(1)
    }

    pub(crate) fn info_max_column(&self, info: ViewLineInfo) -> u32 {
        self.owner(info)
            .and_then(|projection| projection.max_column(&self.model, info.model_line, info.row))
            .unwrap_or(1)
    }

    pub fn view_line_data(&self, view_line: u32) -> Result<ViewLineData> {
        let info = self.view_line_info(view_line);
        self.owner(info)?
            .view_line_data(&self.model, info.model_line, info.row)
    }

    /// Data for view lines `start..=end`. Entry `i` is produced only when
    /// `needed[i]` is true; missing entries count as not needed.
    pub fn view_lines_data(
        &self,
        start: u32,
        end: u32,
        needed: &[bool],
    ) -> Result<Vec<Option<ViewLineData>>> {
        let start = self.valid_view_line(start);
        let end = self.valid_view_line(end);
        if end < start {
            return Ok(Vec::new());
        }

        let first = self.view_line_info(start);
        let wanted = (end - start + 1) as usize;
        let mut result = Vec::with_capacity(wanted);
        let lines = self.projections.iter().enumerate().skip(first.model_line as usize - 1);
        for (index, projection) in lines {
            if result.len() == wanted {
                break;
            }
            let first_row = if index as u32 + 1 == first.model_line {
                first.row
            } else {
                0
            };
            for row in first_row..projection.view_line_count() as usize {
                if result.len() == wanted {
                    break;
                }
                let data = if needed.get(result.len()).copied().unwrap_or(false) {
                    Some(projection.view_line_data(&self.model, index as u32 + 1, row)?)
                } else {
                    None
                };
                result.push(data);
            }
        }
        Ok(result)
    }

    /// Convert a model position to the view, after validating it.
    ///
    /// A hidden position maps to the end of the nearest visible line above it,
    /// or to `(1, 1)` when there is none.
    pub fn model_to_view(&self, position: ModelPosition, affinity: Affinity) -> ViewPosition {
        let fallback = ViewPosition::new(1, 1);
        if self.projections.is_empty() {
            return fallback;
        }
        let position = self.model.validate_position(position);

        let Some(index) = self.nearest_visible_index(position.line as usize - 1) else {
            return fallback;
        };
        let column = if index as u32 + 1 == position.line {
            position.column
        } else {
            self.model.line_max_column(index as u32 + 1)
        };

        let result = self.view_line_base(index).and_then(|base| {
            self.projections[index].view_position_of_model_position(base, column, affinity)
        });
        match result {
            Ok(view) => {
                trace!(%position, %view, "model to view");
                view
            },
            Err(err) => {
                warn!(%err, %position, "model to view conversion failed");
                fallback
            },
        }
    }

    /// Index of the closest visible model line at or above `index`.
    fn nearest_visible_index(&self, mut index: usize) -> Option<usize> {
        while !self.projections.get(index)?.is_visible() {
            let line = index as u32 + 1;
            index = match self.hidden_areas.range_containing(line) {
                Some(range) if range.start > 1 => range.start as usize - 2,
                Some(_) => return None,
                None => index.checked_sub(1)?,
            };
        }
        Some(index)
    }

    /// Convert a view position to a validated model position.
    pub fn view_to_model(&self, position: ViewPosition) -> ModelPosition {
        let info = self.view_line_info(position.line);
        let column = self
            .owner(info)
            .and_then(|projection| projection.model_column_of_view_position(info.row, position.column))
            .unwrap_or(position.column);
        self.model
            .validate_position(ModelPosition::new(info.model_line, column))
    }

    /// Convert a model range to the view.
    ///
    /// An empty range converts its single position with `affinity`. A
    /// non-empty range keeps its start right of and its end left of any
    /// boundary.
    pub fn model_range_to_view(&self, range: ModelRange, affinity: Affinity) -> ViewRange {
        if range.is_empty() {
            let position = self.model_to_view(range.start, affinity);
            return ViewRange {
                start: position,
                end: position,
            };
        }
        ViewRange {
            start: self.model_to_view(range.start, Affinity::Right),
            end: self.model_to_view(range.end, Affinity::Left),
        }
    }

    pub fn view_range_to_model(&self, range: ViewRange) -> ModelRange {
        ModelRange {
            start: self.view_to_model(range.start),
            end: self.view_to_model(range.end),
        }
    }

    /// Clamp `position` to its view line and confirm it still shows
    /// `expected`, falling back to the current view position of `expected`.
    pub fn validate_view_position(
        &self,
        position: ViewPosition,
        expected: ModelPosition,
    ) -> ViewPosition {
        let line = self.valid_view_line(position.line);
        let info = self.view_line_info(line);
        let min = self.info_min_column(info);
        let max = self.info_max_column(info);
        let column = position.column.clamp(min, max.max(min));

        let computed = self.view_to_model(ViewPosition::new(line, column));
        if computed == expected {
            ViewPosition::new(line, column)
        } else {
            trace!(%computed, %expected, "view position went stale");
            self.model_to_view(expected, Affinity::None)
        }
    }

    pub fn validate_view_range(&self, range: ViewRange, expected: ModelRange) -> ViewRange {
        ViewRange {
            start: self.validate_view_position(range.start, expected.start),
            end: self.validate_view_position(range.end, expected.end),
        }
    }

    /// False for hidden lines and for lines outside the model.
    pub fn model_position_is_visible(&self, position: ModelPosition) -> bool {
        self.projection(position.line)
            .is_some_and(LineProjection::is_visible)
    }

    /// View lines owned by `model_line`; 1 for lines outside the model.
    pub fn model_line_view_line_count(&self, model_line: u32) -> u32 {
        self.projection(model_line)
            .map_or(1, LineProjection::view_line_count)
    }

    /// View line showing `position`, using the nearest visible line above a
    /// hidden one.
    pub fn view_line_number_of_model_position(&self, position: ModelPosition) -> u32 {
        let position = self.model.validate_position(position);
        let Some(index) = position
            .line
            .checked_sub(1)
            .and_then(|index| self.nearest_visible_index(index as usize))
        else {
            return 1;
        };
        let column = if index as u32 + 1 == position.line {
            position.column
        } else {
            self.model.line_max_column(index as u32 + 1)
        };
        self.view_line_base(index)
            .and_then(|base| self.projections[index].view_line_number_of_model_position(base, column))
            .unwrap_or(1)
    }

    pub fn injected_text_at(&self, position: ViewPosition) -> Option<&InjectedTextOptions> {
        let info = self.view_line_info(position.line);
        self.projection(info.model_line)?
            .injected_text_at(info.row, position.column)
    }

    /// Move `position` out of injected text or across a wrap boundary.
    pub fn normalize_position(&self, position: ViewPosition, affinity: Affinity) -> ViewPosition {
        let line = self.valid_view_line(position.line);
        let info = self.view_line_info(line);
        let min_column = self.info_min_column(info);
        let column = position
            .column
            .clamp(min_column, self.info_max_column(info).max(min_column));
        let position = ViewPosition::new(line, column);
        self.owner(info)
            .and_then(|projection| projection.normalize_position(info.row, position, affinity))
            .unwrap_or(position)
    }

    /// Indent column of the model line starting at `view_line`, 0 for wrapped
    /// continuation rows.
    pub fn line_indent_column(&self, view_line: u32) -> u32 {
        let info = self.view_line_info(view_line);
        if info.is_wrapped_continuation() {
            return 0;
        }
        self.model.line_indent_column(info.model_line)
    }

    /// Model start and end of view lines `start..=end`, each paired with the
    /// view lines it owns, split wherever hidden lines interrupt the span.
    pub(crate) fn view_lines_grouped_by_model_ranges(
        &self,
        start: u32,
        end: u32,
    ) -> Vec<(ModelRange, Vec<ViewLineInfo>)> {
        let first = self.view_line_info(start);
        let last = self.view_line_info(end);

        let mut groups = Vec::new();
        let mut group_start = Some(self.model_start_of(first));
        let mut view_lines = Vec::new();

        for line in first.model_line..=last.model_line {
            let Some(projection) = self.projection(line) else {
                break;
            };
            if projection.is_visible() {
                let from = if line == first.model_line { first.row } else { 0 };
                let to = if line == last.model_line {
                    last.row + 1
                } else {
                    projection.view_line_count() as usize
                };
                view_lines.extend((from..to).map(|row| ViewLineInfo {
                    model_line: line,
                    row,
                }));

                if group_start.is_none() {
                    group_start = Some(ModelPosition::new(line, 1));
                }
            } else if let Some(start) = group_start.take() {
                let end = ModelPosition::new(line - 1, self.model.line_max_column(line - 1));
                groups.push((ModelRange { start, end }, std::mem::take(&mut view_lines)));
            }
        }

        if let Some(start) = group_start {
            let end = self.model_end_of(last);
            groups.push((ModelRange { start, end }, view_lines));
        }
        groups
    }

    fn model_start_of(&self, info: ViewLineInfo) -> ModelPosition {
        let column = self
            .owner(info)
            .and_then(|projection| {
                projection.model_column_of_view_position(info.row, self.info_min_column(info))
            })
            .unwrap_or(1);
        ModelPosition::new(info.model_line, column)
    }

    fn model_end_of(&self, info: ViewLineInfo) -> ModelPosition {
        let column = self
            .owner(info)
            .and_then(|projection| {
                projection.model_column_of_view_position(info.row, self.info_max_column(info))
            })
            .unwrap_or(1);
        ModelPosition::new(info.model_line, column)
    }

    /// Split the model lines between two model positions into maximal runs
    /// of visible lines. The first run starts at `start`, the last ends at
    /// `end`, and runs broken by hidden lines end at their line's max column.
    pub(crate) fn visible_model_ranges(
        &self,
        start: ModelPosition,
        end: ModelPosition,
        first_column: u32,
    ) -> Vec<ModelRange> {
        let mut ranges = Vec::new();
        let mut run_start: Option<ModelPosition> = None;
        for line in start.line..=end.line {
            let visible = self.projection(line).is_some_and(LineProjection::is_visible);
            if visible {
                if run_start.is_none() {
                    let column = if line == start.line { first_column } else { 1 };
                    run_start = Some(ModelPosition::new(line, column));
                }
            } else if let Some(run) = run_start.take() {
                let end = ModelPosition::new(line - 1, self.model.line_max_column(line - 1));
                ranges.push(ModelRange { start: run, end });
            }
        }
        if let Some(run) = run_start {
            ranges.push(ModelRange { start: run, end });
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{injected_text::LineInjectedText, model::LineBuffer, settings::WrappingIndent};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn create_table(text: &str) -> ProjectionTable<LineBuffer> {
        ProjectionTable::new(LineBuffer::from_text(text), WrapSettings::default(), 4)
    }

    fn wrapped_at(text: &str, column: u32) -> ProjectionTable<LineBuffer> {
        let settings = WrapSettings {
            wrapping_indent: WrappingIndent::None,
            ..WrapSettings::wrapped_at(column)
        };
        ProjectionTable::new(LineBuffer::from_text(text), settings, 4)
    }

    fn break_data(break_offsets: Vec<u32>, indent: u32) -> LineBreakData {
        let visible = break_offsets.clone();
        LineBreakData::new(Vec::new(), break_offsets, visible, indent)
    }

    fn range(start: u32, end: u32) -> LineRange {
        LineRange::new(start, end)
    }

    fn contents(table: &ProjectionTable<LineBuffer>) -> Vec<String> {
        (1..=table.view_line_count())
            .map(|line| table.view_line_content(line).unwrap())
            .collect()
    }

    fn assert_consistent(table: &ProjectionTable<LineBuffer>) {
        assert_eq!(table.view_line_count(), table.projected_line_count());
        assert_eq!(table.projections.len() as u32, table.model().line_count());
        assert!(table.view_line_count() > 0);
    }

    #[test]
    fn identity_table() {
        let table = create_table("abc\ndefgh");
        assert_eq!(table.view_line_count(), 2);
        assert_eq!(
            table.model_to_view(ModelPosition::new(2, 3), Affinity::None),
            ViewPosition::new(2, 3)
        );
        assert_eq!(
            table.view_to_model(ViewPosition::new(2, 3)),
            ModelPosition::new(2, 3)
        );
        assert_eq!(contents(&table), vec!["abc", "defgh"]);
    }

    #[test]
    fn wrapped_line_adds_view_lines() {
        let mut table = create_table("abc\ndefgh");
        let change = table
            .apply_line_changed(None, 2, Some(break_data(vec![3, 5], 2)))
            .unwrap()
            .unwrap();

        assert_eq!(table.view_line_count(), 3);
        assert_eq!(table.view_line_min_column(3), Ok(3));
        assert_eq!(contents(&table), vec!["abc", "def", "  gh"]);
        assert!(change.mapping_changed);
        assert_eq!(change.changed, Some(ViewLinesChanged::new(2, 2)));
        assert_eq!(change.inserted, Some(ViewLinesInserted::new(3, 3)));
        assert_eq!(change.deleted, None);
        assert_eq!(table.view_line_info(3), ViewLineInfo { model_line: 2, row: 1 });
    }

    #[test]
    fn line_change_shrinking() {
        let mut table = wrapped_at("abcdefghi", 3);
        assert_eq!(table.view_line_count(), 3);

        table.model_mut().set_line(1, "abcd").unwrap();
        let version = table.model().version_id();
        let data = table.compute_line_breaks(1, 1).pop().flatten();
        let change = table.apply_line_changed(Some(version), 1, data).unwrap().unwrap();

        assert_eq!(change.changed, Some(ViewLinesChanged::new(1, 2)));
        assert_eq!(change.deleted, Some(ViewLinesDeleted::new(3, 3)));
        assert_eq!(table.view_line_count(), 2);
    }

    #[test]
    fn line_change_same_count_keeps_mapping() {
        let mut table = create_table("abc\ndef");
        let change = table.apply_line_changed(None, 1, None).unwrap().unwrap();
        assert!(!change.mapping_changed);
        assert_eq!(change.changed, Some(ViewLinesChanged::new(1, 1)));
        assert!(change.inserted.is_none() && change.deleted.is_none());
    }

    #[test]
    fn folded_line_maps_to_previous_line() {
        let mut table = create_table("one\ntwo\nthree");
        assert_eq!(table.set_hidden_areas(&[range(2, 2)]), Ok(true));

        assert_eq!(table.view_line_count(), 2);
        assert_eq!(
            table.model_to_view(ModelPosition::new(2, 1), Affinity::None),
            ViewPosition::new(1, 4)
        );
        assert_eq!(
            table.model_to_view(ModelPosition::new(3, 1), Affinity::None),
            ViewPosition::new(2, 1)
        );
        assert!(!table.model_position_is_visible(ModelPosition::new(2, 1)));
        assert_eq!(table.model_line_view_line_count(2), 0);
        assert_eq!(table.model_line_view_line_count(9), 1);
        assert_eq!(table.view_line_number_of_model_position(ModelPosition::new(2, 1)), 1);
        assert_eq!(contents(&table), vec!["one", "three"]);
    }

    #[test]
    fn fold_at_top_falls_back_to_origin() {
        let mut table = create_table("one\ntwo\nthree");
        table.set_hidden_areas(&[range(1, 2)]).unwrap();
        assert_eq!(
            table.model_to_view(ModelPosition::new(2, 3), Affinity::None),
            ViewPosition::new(1, 1)
        );
    }

    #[test]
    fn hidden_areas_normalize_and_dedupe() {
        let mut table = create_table("1\n2\n3\n4\n5");
        assert_eq!(table.set_hidden_areas(&[range(2, 2), range(4, 4)]), Ok(true));
        assert_eq!(table.hidden_areas().len(), 2);

        assert_eq!(
            table.set_hidden_areas(&[range(2, 2), range(3, 3), range(4, 4)]),
            Ok(true)
        );
        assert_eq!(table.hidden_areas(), &[range(2, 4)]);
        assert_eq!(table.view_line_count(), 2);

        assert_eq!(table.set_hidden_areas(&[range(2, 4)]), Ok(false));
    }

    #[test]
    fn hiding_everything_reveals_everything() {
        let mut table = create_table("1\n2\n3");
        assert_eq!(table.set_hidden_areas(&[range(1, 3)]), Ok(true));
        assert!(table.hidden_areas().is_empty());
        assert_eq!(table.view_line_count(), 3);
    }

    #[test]
    fn inserted_lines_and_stale_versions() {
        let mut table = create_table("a\nb\nc");
        let v1 = table.model().version_id();
        assert_eq!(table.valid_version(), Some(v1));

        table.model_mut().insert_lines(2, ["x", "y"]).unwrap();
        let v2 = table.model().version_id();
        assert!(v2 > v1);

        let inserted = table.apply_lines_inserted(v2, 2, vec![None, None]).unwrap();
        assert_eq!(inserted, Some(ViewLinesInserted::new(2, 3)));
        assert_eq!(table.view_line_count(), 5);
        table.accept_version(v2).unwrap();

        let before = contents(&table);
        assert_eq!(table.apply_lines_inserted(v1, 2, vec![None, None]), Ok(None));
        assert_eq!(table.apply_lines_deleted(v1, 2, 3), Ok(None));
        assert_eq!(table.apply_line_changed(Some(v1), 2, None), Ok(None));
        assert_eq!(contents(&table), before);
        assert_eq!(before, vec!["a", "x", "y", "b", "c"]);
    }

    #[test]
    fn deleted_lines_report_view_range() {
        let mut table = wrapped_at("aaaaaa\nb\ncc\nd", 3);
        assert_eq!(table.view_line_count(), 5);

        table.model_mut().delete_lines(1, 2).unwrap();
        let version = table.model().version_id();
        let deleted = table.apply_lines_deleted(version, 1, 2).unwrap();
        assert_eq!(deleted, Some(ViewLinesDeleted::new(1, 3)));
        table.accept_version(version).unwrap();

        assert_eq!(contents(&table), vec!["cc", "d"]);
        assert!(table.apply_lines_deleted(version + 1, 3, 3).is_err());
    }

    #[test]
    fn deleting_hidden_lines_reports_empty_range() {
        let mut table = create_table("a\nb\nc\nd");
        table.set_hidden_areas(&[range(2, 3)]).unwrap();

        table.model_mut().delete_lines(2, 3).unwrap();
        let version = table.model().version_id();
        let deleted = table.apply_lines_deleted(version, 2, 3).unwrap().unwrap();
        assert!(deleted.is_empty());
        assert!(table.hidden_areas().is_empty());
        assert_eq!(table.view_line_count(), 2);
    }

    #[test]
    fn lines_inserted_after_fold_stay_hidden() {
        let mut table = create_table("a\nb\nc");
        table.set_hidden_areas(&[range(2, 2)]).unwrap();

        table.model_mut().insert_lines(3, ["n"]).unwrap();
        let version = table.model().version_id();
        let inserted = table
            .apply_lines_inserted(version, 3, vec![None])
            .unwrap()
            .unwrap();
        assert!(inserted.is_empty());
        assert_eq!(table.hidden_areas(), &[range(2, 3)]);
        assert_eq!(contents(&table), vec!["a", "c"]);
    }

    #[test]
    fn accept_version_reveals_single_hidden_line() {
        let mut table = create_table("a\nb");
        table.set_hidden_areas(&[range(2, 2)]).unwrap();

        table.model_mut().delete_lines(1, 1).unwrap();
        let version = table.model().version_id();
        table.apply_lines_deleted(version, 1, 1).unwrap();
        assert_eq!(table.view_line_count(), 0);

        table.accept_version(version).unwrap();
        assert_eq!(table.view_line_count(), 1);
        assert_eq!(contents(&table), vec!["b"]);
    }

    #[test]
    fn wrap_settings_round_trip() {
        let mut table = create_table("hello world foo");
        assert_eq!(table.view_line_count(), 1);
        assert!(!table.set_wrap_settings(WrapSettings::default()));

        let settings = WrapSettings {
            wrapping_indent: WrappingIndent::None,
            ..WrapSettings::wrapped_at(8)
        };
        assert!(table.set_wrap_settings(settings.clone()));
        assert_eq!(contents(&table), vec!["hello ", "world ", "foo"]);

        assert!(table.set_wrap_settings(WrapSettings {
            wrapping_column: Some(12),
            ..settings
        }));
        assert_eq!(contents(&table), vec!["hello world ", "foo"]);
    }

    #[test]
    fn tab_size_change_rebuilds_and_keeps_folds() {
        let mut table = wrapped_at("\tab\nc\nd", 6);
        table.set_hidden_areas(&[range(3, 3)]).unwrap();
        assert_eq!(table.view_line_count(), 2);

        assert!(table.set_tab_size(8));
        assert!(!table.set_tab_size(8));
        assert_eq!(table.view_line_count(), 3);
        assert_eq!(table.hidden_areas(), &[range(3, 3)]);
    }

    #[test]
    fn view_line_numbers_are_clamped() {
        let table = create_table("abc\ndefgh");
        assert_eq!(table.view_line_info(0), ViewLineInfo { model_line: 1, row: 0 });
        assert_eq!(table.view_line_info(99), ViewLineInfo { model_line: 2, row: 0 });
        assert_eq!(table.view_line_content(99).unwrap(), "defgh");
        assert_eq!(
            table.view_to_model(ViewPosition::new(9, 99)),
            ModelPosition::new(2, 6)
        );
    }

    #[test]
    fn view_lines_data_respects_needed_mask() {
        let mut table = wrapped_at("abcdef\nxy\nz", 3);
        table.set_hidden_areas(&[range(2, 2)]).unwrap();

        let data = table.view_lines_data(2, 3, &[true, false]).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].as_ref().map(|d| d.content.as_str()), Some("def"));
        assert!(data[1].is_none());

        let data = table.view_lines_data(1, 3, &[true, true, true]).unwrap();
        let contents: Vec<_> = data.iter().flatten().map(|d| d.content.clone()).collect();
        assert_eq!(contents, vec!["abc", "def", "z"]);
        assert!(data[0].as_ref().is_some_and(|d| d.continues_with_wrapped_line));
    }

    #[test]
    fn range_conversion_uses_boundary_affinity() {
        let table = wrapped_at("abcdef", 3);
        let view = table.model_range_to_view(ModelRange::new(1, 4, 1, 4), Affinity::Left);
        assert_eq!(view, ViewRange::new(1, 4, 1, 4));

        let view = table.model_range_to_view(ModelRange::new(1, 4, 1, 7), Affinity::None);
        assert_eq!(view, ViewRange::new(2, 1, 2, 4));

        let view = table.model_range_to_view(ModelRange::new(1, 1, 1, 4), Affinity::None);
        assert_eq!(view, ViewRange::new(1, 1, 1, 4));

        assert_eq!(
            table.view_range_to_model(ViewRange::new(1, 2, 2, 3)),
            ModelRange::new(1, 2, 1, 6)
        );
    }

    #[test]
    fn validate_view_position_falls_back_to_expected() {
        let table = create_table("abc\ndefgh");
        assert_eq!(
            table.validate_view_position(ViewPosition::new(2, 9), ModelPosition::new(2, 6)),
            ViewPosition::new(2, 6)
        );
        assert_eq!(
            table.validate_view_position(ViewPosition::new(1, 2), ModelPosition::new(2, 2)),
            ViewPosition::new(2, 2)
        );
        assert_eq!(
            table.validate_view_range(
                ViewRange::new(1, 1, 1, 2),
                ModelRange::new(1, 1, 1, 2)
            ),
            ViewRange::new(1, 1, 1, 2)
        );
    }

    #[test]
    fn indent_column_only_on_first_row() {
        let settings = WrapSettings {
            wrapping_indent: WrappingIndent::Same,
            ..WrapSettings::wrapped_at(6)
        };
        let table = ProjectionTable::new(LineBuffer::from_text("  abcdefgh"), settings, 4);
        assert!(table.view_line_count() > 1);
        assert_eq!(table.line_indent_column(1), 3);
        assert_eq!(table.line_indent_column(2), 0);
    }

    #[test]
    fn injected_text_from_model() {
        let mut buffer = LineBuffer::from_text("let x = 1;");
        buffer.add_injected_text(LineInjectedText::new(
            1,
            6,
            InjectedTextOptions::new(": u32"),
            0,
        ));
        let table = ProjectionTable::new(buffer, WrapSettings::default(), 4);

        assert_eq!(table.view_line_content(1).unwrap(), "let x: u32 = 1;");
        assert_eq!(
            table.injected_text_at(ViewPosition::new(1, 8)).map(|o| o.content.as_str()),
            Some(": u32")
        );
        assert_eq!(
            table.model_to_view(ModelPosition::new(1, 6), Affinity::Right),
            ViewPosition::new(1, 11)
        );
        assert_eq!(
            table.view_to_model(ViewPosition::new(1, 8)),
            ModelPosition::new(1, 6)
        );
        assert_eq!(
            table.normalize_position(ViewPosition::new(1, 8), Affinity::None),
            ViewPosition::new(1, 6)
        );
    }

    #[test]
    fn normalize_clamps_out_of_range_lines() {
        let table = wrapped_at("a\nabcdef", 3);
        assert_eq!(table.view_line_count(), 3);

        let clamped = table.normalize_position(ViewPosition::new(99, 1), Affinity::Left);
        assert_eq!(
            clamped,
            table.normalize_position(ViewPosition::new(3, 1), Affinity::Left)
        );
        assert_eq!(clamped, ViewPosition::new(2, 4));
        assert_eq!(
            table.normalize_position(ViewPosition::new(0, 50), Affinity::None),
            ViewPosition::new(1, 2)
        );
    }

    #[test]
    fn grouped_view_lines_skip_folds() {
        let mut table = create_table("a\nb\nc\nd\ne");
        table.set_hidden_areas(&[range(2, 3)]).unwrap();

        let groups = table.view_lines_grouped_by_model_ranges(1, 3);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, ModelRange::new(1, 1, 1, 2));
        assert_eq!(groups[0].1.len(), 1);
        assert_eq!(groups[1].0, ModelRange::new(4, 1, 5, 2));
        assert_eq!(
            groups[1].1,
            vec![
                ViewLineInfo { model_line: 4, row: 0 },
                ViewLineInfo { model_line: 5, row: 0 },
            ]
        );
    }

    #[test]
    fn round_trip_keeps_view_line() {
        let mut table = wrapped_at("alpha beta gamma\n\nshort\nanother long line here", 7);
        table.set_hidden_areas(&[range(3, 3)]).unwrap();

        for line in 1..=table.view_line_count() {
            let min = table.view_line_min_column(line).unwrap();
            let max = table.view_line_max_column(line).unwrap();
            for column in min..=max {
                let model = table.view_to_model(ViewPosition::new(line, column));
                let back = table.model_to_view(model, Affinity::None);
                let back_left = table.model_to_view(model, Affinity::Left);
                assert!(
                    back.line == line || back_left.line == line,
                    "view ({line},{column}) -> model {model} -> view {back}"
                );
            }
        }
    }

    #[test]
    fn random_edits_keep_counts_consistent() {
        viewlines_log::test();
        let mut rng = StdRng::seed_from_u64(42);
        let mut table = wrapped_at("one\ntwo two two\nthree\nfour four\nfive", 5);

        for _ in 0..300 {
            let line_count = table.model().line_count();
            match rng.gen_range(0..5) {
                0 => {
                    let at = rng.gen_range(1..=line_count + 1);
                    let count = rng.gen_range(1..4);
                    let lines: Vec<String> = (0..count)
                        .map(|_| "w".repeat(rng.gen_range(0..12)))
                        .collect();
                    table.model_mut().insert_lines(at, lines).unwrap();
                    let version = table.model().version_id();
                    let breaks = table.compute_line_breaks(at, at + count - 1);
                    assert!(table.apply_lines_inserted(version, at, breaks).unwrap().is_some());
                    table.accept_version(version).unwrap();
                },
                1 if line_count > 1 => {
                    let from = rng.gen_range(1..line_count);
                    let to = rng.gen_range(from..line_count);
                    table.model_mut().delete_lines(from, to).unwrap();
                    let version = table.model().version_id();
                    assert!(table.apply_lines_deleted(version, from, to).unwrap().is_some());
                    table.accept_version(version).unwrap();
                },
                2 => {
                    let line = rng.gen_range(1..=line_count);
                    let text = "x ".repeat(rng.gen_range(0..8));
                    table.model_mut().set_line(line, text).unwrap();
                    let version = table.model().version_id();
                    let data = table.compute_line_breaks(line, line).pop().flatten();
                    assert!(table
                        .apply_line_changed(Some(version), line, data)
                        .unwrap()
                        .is_some());
                    table.accept_version(version).unwrap();
                },
                3 => {
                    let start = rng.gen_range(1..=line_count);
                    let end = rng.gen_range(start..=line_count);
                    table.set_hidden_areas(&[range(start, end)]).unwrap();
                },
                _ => {
                    table.set_hidden_areas(&[]).unwrap();
                },
            }

            assert_consistent(&table);
            for (index, projection) in table.projections.iter().enumerate() {
                assert_eq!(
                    projection.is_visible(),
                    !table.hidden_areas.contains(index as u32 + 1)
                );
            }
        }
    }
}
