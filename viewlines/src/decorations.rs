//! Decoration lookup for a range of view lines.

use crate::{
    coords::{ModelPosition, ModelRange, ViewRange},
    model::{DecorationSource, ModelDecoration, TextModel},
    table::ProjectionTable,
};
use tracing::trace;

impl<M: TextModel + DecorationSource> ProjectionTable<M> {
    /// Decorations overlapping `range`, skipping hidden model lines.
    ///
    /// Results are sorted by range and contain each decoration once.
    pub fn decorations_in_range(
        &self,
        range: ViewRange,
        owner_id: Option<u32>,
        filter_out_validation: bool,
    ) -> Vec<ModelDecoration> {
        let model_start = self.view_to_model(range.start);
        let model_end = self.view_to_model(range.end);

        if !self.hides_any_line_in(model_start.line, model_end.line) {
            let query = ModelRange {
                start: ModelPosition::new(model_start.line, 1),
                end: model_end,
            };
            return self
                .model()
                .decorations_in_range(query, owner_id, filter_out_validation);
        }

        let runs = self.visible_model_ranges(model_start, model_end, model_start.column);
        trace!(runs = runs.len(), "querying decorations per visible run");

        let mut decorations: Vec<ModelDecoration> = runs
            .into_iter()
            .flat_map(|run| {
                self.model()
                    .decorations_in_range(run, owner_id, filter_out_validation)
            })
            .collect();
        decorations.sort_by(|a, b| a.range.cmp(&b.range).then(a.id.cmp(&b.id)));
        decorations.dedup_by_key(|decoration| decoration.id);
        decorations
    }
}
