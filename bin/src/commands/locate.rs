use crate::cli::LocateArgs;
use std::{error::Error, io::Write};
use tracing::info;
use viewlines::{Affinity, ModelPosition, ProjectionTable, TextModel};

pub fn run(args: LocateArgs) -> Result<(), Box<dyn Error>> {
    let table = args.view.load()?;
    let position = ModelPosition::new(args.line, args.column);
    let stdout = std::io::stdout();
    write_location(&table, position, args.affinity.into(), &mut stdout.lock())
}

/// Write the view position of `position` and the model position it maps back to.
pub fn write_location<M: TextModel>(
    table: &ProjectionTable<M>,
    position: ModelPosition,
    affinity: Affinity,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let view = table.model_to_view(position, affinity);
    let back = table.view_to_model(view);
    let visible = table.model_position_is_visible(position);
    info!(%position, %view, %back, visible, "located position");

    writeln!(out, "model {}", position)?;
    writeln!(out, "view  {}{}", view, if visible { "" } else { " (hidden)" })?;
    writeln!(out, "back  {}", back)?;
    Ok(())
}
