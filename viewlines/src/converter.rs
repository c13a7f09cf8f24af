//! Coordinate conversion between model and view space.
//!
//! Renderers and cursor logic hold a [`CoordinatesConverter`] instead of the
//! table itself. Two implementations exist:
//!
//! - [`ProjectionConverter`] delegates to a [`ProjectionTable`], so wrapping,
//!   folding and injected text are all accounted for.
//! - [`IdentityConverter`] is for models shown without any projection. View
//!   and model coordinates coincide, so conversions only validate.
//!
//! # Invariants
//!
//! Conversions are total. Out-of-range input is clamped, never rejected, and
//! converting a valid view position to the model and back lands on the same
//! view line.

use crate::{
    coords::{Affinity, ModelPosition, ModelRange, ViewPosition, ViewRange},
    model::TextModel,
    table::ProjectionTable,
};

pub trait CoordinatesConverter {
    fn view_to_model_position(&self, position: ViewPosition) -> ModelPosition;

    fn view_to_model_range(&self, range: ViewRange) -> ModelRange;

    /// Clamp `position` and make sure it still shows `expected`.
    fn validate_view_position(&self, position: ViewPosition, expected: ModelPosition)
        -> ViewPosition;

    fn validate_view_range(&self, range: ViewRange, expected: ModelRange) -> ViewRange;

    fn model_to_view_position(&self, position: ModelPosition, affinity: Affinity) -> ViewPosition;

    fn model_to_view_range(&self, range: ModelRange, affinity: Affinity) -> ViewRange;

    fn model_position_is_visible(&self, position: ModelPosition) -> bool;

    /// Number of view lines showing `model_line`.
    fn model_line_view_line_count(&self, model_line: u32) -> u32;
}

pub struct ProjectionConverter<'a, M> {
    table: &'a ProjectionTable<M>,
}

impl<'a, M: TextModel> ProjectionConverter<'a, M> {
    pub fn new(table: &'a ProjectionTable<M>) -> Self {
        Self { table }
    }
}

impl<M: TextModel> ProjectionTable<M> {
    pub fn converter(&self) -> ProjectionConverter<'_, M> {
        ProjectionConverter::new(self)
    }
}

impl<M: TextModel> CoordinatesConverter for ProjectionConverter<'_, M> {
    fn view_to_model_position(&self, position: ViewPosition) -> ModelPosition {
        self.table.view_to_model(position)
    }

    fn view_to_model_range(&self, range: ViewRange) -> ModelRange {
        self.table.view_range_to_model(range)
    }

    fn validate_view_position(
        &self,
        position: ViewPosition,
        expected: ModelPosition,
    ) -> ViewPosition {
        self.table.validate_view_position(position, expected)
    }

    fn validate_view_range(&self, range: ViewRange, expected: ModelRange) -> ViewRange {
        self.table.validate_view_range(range, expected)
    }

    fn model_to_view_position(&self, position: ModelPosition, affinity: Affinity) -> ViewPosition {
        self.table.model_to_view(position, affinity)
    }

    fn model_to_view_range(&self, range: ModelRange, affinity: Affinity) -> ViewRange {
        self.table.model_range_to_view(range, affinity)
    }

    fn model_position_is_visible(&self, position: ModelPosition) -> bool {
        self.table.model_position_is_visible(position)
    }

    fn model_line_view_line_count(&self, model_line: u32) -> u32 {
        self.table.model_line_view_line_count(model_line)
    }
}

pub struct IdentityConverter<'a, M> {
    model: &'a M,
}

impl<'a, M: TextModel> IdentityConverter<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }

    fn validate(&self, line: u32, column: u32) -> ModelPosition {
        self.model.validate_position(ModelPosition::new(line, column))
    }
}

impl<M: TextModel> CoordinatesConverter for IdentityConverter<'_, M> {
    fn view_to_model_position(&self, position: ViewPosition) -> ModelPosition {
        self.validate(position.line, position.column)
    }

    fn view_to_model_range(&self, range: ViewRange) -> ModelRange {
        ModelRange {
            start: self.view_to_model_position(range.start),
            end: self.view_to_model_position(range.end),
        }
    }

    fn validate_view_position(
        &self,
        _position: ViewPosition,
        expected: ModelPosition,
    ) -> ViewPosition {
        let valid = self.model.validate_position(expected);
        ViewPosition::new(valid.line, valid.column)
    }

    fn validate_view_range(&self, _range: ViewRange, expected: ModelRange) -> ViewRange {
        let valid = self.model.validate_range(expected);
        ViewRange::new(
            valid.start.line,
            valid.start.column,
            valid.end.line,
            valid.end.column,
        )
    }

    fn model_to_view_position(&self, position: ModelPosition, _affinity: Affinity) -> ViewPosition {
        let valid = self.validate(position.line, position.column);
        ViewPosition::new(valid.line, valid.column)
    }

    fn model_to_view_range(&self, range: ModelRange, affinity: Affinity) -> ViewRange {
        ViewRange {
            start: self.model_to_view_position(range.start, affinity),
            end: self.model_to_view_position(range.end, affinity),
        }
    }

    fn model_position_is_visible(&self, position: ModelPosition) -> bool {
        (1..=self.model.line_count()).contains(&position.line)
    }

    fn model_line_view_line_count(&self, _model_line: u32) -> u32 {
        1
    }
}
