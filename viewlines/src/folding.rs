//! Normalized hidden areas.
//!
//! Hidden areas are inclusive model line ranges, kept sorted, non-overlapping
//! and with no two ranges touching. Normalizing `[[2,2],[3,3],[4,4]]` yields
//! `[[2,4]]`.

use crate::coords::LineRange;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenAreas {
    ranges: Vec<LineRange>,
}

impl HiddenAreas {
    /// Clamp `ranges` to `1..=line_count`, then sort and merge them.
    pub fn normalize(ranges: &[LineRange], line_count: u32) -> Self {
        let mut clamped: Vec<LineRange> = ranges
            .iter()
            .map(|range| {
                LineRange::new(
                    range.start.clamp(1, line_count.max(1)),
                    range.end.clamp(1, line_count.max(1)),
                )
            })
            .filter(|range| !range.is_empty() && line_count > 0)
            .collect();
        clamped.sort();

        let mut merged: Vec<LineRange> = Vec::with_capacity(clamped.len());
        for range in clamped {
            match merged.last_mut() {
                Some(current) if range.start <= current.end + 1 => {
                    current.end = current.end.max(range.end);
                },
                _ => merged.push(range),
            }
        }
        Self { ranges: merged }
    }

    pub fn ranges(&self) -> &[LineRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The hidden range containing `line`.
    pub fn range_containing(&self, line: u32) -> Option<LineRange> {
        let index = self.ranges.partition_point(|range| range.end < line);
        self.ranges
            .get(index)
            .filter(|range| range.contains(line))
            .copied()
    }

    pub fn contains(&self, line: u32) -> bool {
        self.range_containing(line).is_some()
    }

    /// True when any hidden line lies in `start..=end`.
    pub fn intersects(&self, start: u32, end: u32) -> bool {
        let index = self.ranges.partition_point(|range| range.end < start);
        self.ranges
            .get(index)
            .is_some_and(|range| range.start <= end)
    }

    /// Number of model lines covered by all ranges.
    pub fn hidden_line_count(&self) -> u32 {
        self.ranges.iter().map(LineRange::len).sum()
    }

    /// Re-clamp against a new line count.
    pub fn revalidated(&self, line_count: u32) -> Self {
        Self::normalize(&self.ranges, line_count)
    }

    /// Follow the deletion of model lines `from..=to`.
    pub fn on_lines_deleted(&mut self, from: u32, to: u32) {
        let count = to - from + 1;
        let shift = |line: u32, past_end: u32| {
            if line < from {
                line
            } else if line > to {
                line - count
            } else {
                past_end
            }
        };

        let ranges: Vec<LineRange> = self
            .ranges
            .iter()
            .filter_map(|range| {
                let start = shift(range.start, from);
                let end = shift(range.end, from.saturating_sub(1));
                (start <= end && end >= 1).then(|| LineRange::new(start, end))
            })
            .collect();
        *self = Self::normalize_unbounded(ranges);
    }

    /// Follow the insertion of `count` model lines before line `at`.
    ///
    /// Lines inserted right after a hidden line join its range.
    pub fn on_lines_inserted(&mut self, at: u32, count: u32) {
        let ranges: Vec<LineRange> = self
            .ranges
            .iter()
            .map(|range| {
                if range.start >= at {
                    LineRange::new(range.start + count, range.end + count)
                } else if range.end + 1 >= at {
                    LineRange::new(range.start, range.end + count)
                } else {
                    *range
                }
            })
            .collect();
        *self = Self::normalize_unbounded(ranges);
    }

    fn normalize_unbounded(ranges: Vec<LineRange>) -> Self {
        let last = ranges.iter().map(|range| range.end).max().unwrap_or(0);
        Self::normalize(&ranges, last)
    }
}
