//! Line projection for text views.
//!
//! Maps the lines of a text model onto the rows a view renders, accounting
//! for soft wrapping, folded (hidden) line ranges and injected text.
//!
//! ```text
//! model line 1  "fn main() {"             view 1  "fn main() {"
//! model line 2  "    let x = compute();"  view 2  "    let x = "
//!                                         view 3  "    compute();"
//! model line 3  "    // folded"           (hidden)
//! model line 4  "}"                       view 4  "}"
//! ```
//!
//! Each model line owns a [`LineProjection`] telling how many view lines it
//! produces. [`ProjectionTable`] keeps one projection per model line plus a
//! [`PrefixSumIndex`] over their view line counts, which turns view line lookup
//! into a logarithmic search. [`GuideProjector`] remaps per-model-line guide
//! data onto view lines, and [`CoordinatesConverter`] exposes conversions to
//! code that should not depend on the table.
//!
//! # Usage
//!
//! ```ignore
//! let buffer = LineBuffer::from_text("fn main() {\n    let x = compute();\n}");
//! let mut table = ProjectionTable::new(buffer, WrapSettings::wrapped_at(16), 4);
//! table.set_hidden_areas(&[LineRange::new(3, 3)])?;
//!
//! let view = table.model_to_view(ModelPosition::new(2, 13), Affinity::None);
//! let back = table.view_to_model(view);
//! ```
//!
//! All coordinates are 1-based. Columns count `char`s.

mod converter;
mod coords;
mod decorations;
mod error;
mod events;
mod folding;
mod guides;
mod injected_text;
mod line_break;
mod model;
mod monospace;
mod prefix_sum;
mod projection;
mod settings;
mod table;

pub use converter::{CoordinatesConverter, IdentityConverter, ProjectionConverter};
pub use coords::{
    Affinity, LineRange, ModelPosition, ModelRange, OutputPosition, ViewPosition, ViewRange,
};
pub use error::{Error, Result};
pub use events::{LineMappingChange, ViewLinesChanged, ViewLinesDeleted, ViewLinesInserted};
pub use folding::HiddenAreas;
pub use guides::GuideProjector;
pub use injected_text::{apply_injections, InjectedTextOptions, Injection, LineInjectedText};
pub use line_break::{LineBreakData, LineBreakRequest, LineBreaksComputer};
pub use model::{
    ActiveIndentGuide, BracketGuideOptions, DecorationId, DecorationSource, GuideSource,
    HorizontalGuides, IndentGuide, IndentGuideHorizontalLine, LineBuffer, ModelDecoration,
    TextModel,
};
pub use monospace::MonospaceLineBreaksComputer;
pub use prefix_sum::PrefixSumIndex;
pub use projection::{InlineDecoration, LineProjection, ViewLineData};
pub use settings::{FontInfo, WrapSettings, WrappingIndent, WrappingStrategy, DEFAULT_TAB_SIZE};
pub use table::{ProjectionTable, ViewLineInfo};
