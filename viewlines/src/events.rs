//! View line ranges reported by structural updates.
//!
//! Each event covers the inclusive view line range `from..=to`. A range with
//! `from > to` is empty, which happens when the affected model lines are all
//! hidden.

use crate::coords::LineRange;

macro_rules! view_line_event {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            pub from: u32,
            pub to: u32,
        }

        impl $name {
            pub const fn new(from: u32, to: u32) -> Self {
                Self { from, to }
            }

            pub fn is_empty(&self) -> bool {
                self.from > self.to
            }

            pub fn range(&self) -> LineRange {
                LineRange::new(self.from, self.to)
            }
        }
    };
}

view_line_event!(
    /// View lines whose content changed in place.
    ViewLinesChanged
);
view_line_event!(
    /// View lines that now exist and did not before.
    ViewLinesInserted
);
view_line_event!(
    /// View lines that no longer exist.
    ViewLinesDeleted
);

/// Outcome of replacing the projection of one changed model line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineMappingChange {
    /// The number of view lines owned by the model line changed.
    pub mapping_changed: bool,
    pub changed: Option<ViewLinesChanged>,
    pub inserted: Option<ViewLinesInserted>,
    pub deleted: Option<ViewLinesDeleted>,
}
