use clap::{Args, Parser, Subcommand, ValueEnum};
use std::{error::Error, fs, path::PathBuf};
use tracing::debug;
use viewlines::{
    Affinity, LineBuffer, LineRange, ProjectionTable, WrapSettings, WrappingIndent,
    DEFAULT_TAB_SIZE,
};

#[derive(Debug, Parser)]
#[command(name = "viewlines", version, about)]
pub struct Cli {
    /// Write logs to this file, or into this directory when it has no extension.
    #[arg(long, global = true, env = "VIEWLINES_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print every view line with the model line and row it comes from.
    Render(RenderArgs),
    /// Convert a model position to the view and back.
    Locate(LocateArgs),
}

/// How a file is projected.
#[derive(Debug, Args)]
pub struct ViewArgs {
    pub file: PathBuf,

    /// Wrap lines wider than this many columns.
    #[arg(long)]
    pub wrap_column: Option<u32>,

    #[arg(long, default_value_t = DEFAULT_TAB_SIZE)]
    pub tab_size: u32,

    /// Indentation of wrapped continuation rows.
    #[arg(long, value_enum, default_value_t = IndentArg::Same)]
    pub indent: IndentArg,

    /// Hide model lines START-END (inclusive). May be repeated.
    #[arg(long, value_parser = parse_fold)]
    pub fold: Vec<LineRange>,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Prefix every line with its indent guide level.
    #[arg(long)]
    pub guides: bool,
}

#[derive(Debug, Args)]
pub struct LocateArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    #[arg(long)]
    pub line: u32,

    #[arg(long)]
    pub column: u32,

    #[arg(long, value_enum, default_value_t = AffinityArg::None)]
    pub affinity: AffinityArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndentArg {
    None,
    Same,
    Indent,
    Deep,
}

impl From<IndentArg> for WrappingIndent {
    fn from(arg: IndentArg) -> Self {
        match arg {
            IndentArg::None => WrappingIndent::None,
            IndentArg::Same => WrappingIndent::Same,
            IndentArg::Indent => WrappingIndent::Indent,
            IndentArg::Deep => WrappingIndent::DeepIndent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AffinityArg {
    Left,
    Right,
    None,
}

impl From<AffinityArg> for Affinity {
    fn from(arg: AffinityArg) -> Self {
        match arg {
            AffinityArg::Left => Affinity::Left,
            AffinityArg::Right => Affinity::Right,
            AffinityArg::None => Affinity::None,
        }
    }
}

fn parse_fold(value: &str) -> Result<LineRange, String> {
    let (start, end) = value.split_once('-').unwrap_or((value, value));
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid line number '{}': {}", part, e))
    };
    let (start, end) = (parse(start)?, parse(end)?);
    if start == 0 || end < start {
        return Err(format!("'{}' is not a range of 1-based lines", value));
    }
    Ok(LineRange::new(start, end))
}

impl ViewArgs {
    pub fn settings(&self) -> WrapSettings {
        WrapSettings {
            wrapping_column: self.wrap_column,
            wrapping_indent: self.indent.into(),
            ..WrapSettings::default()
        }
    }

    /// Read the file and build its projection table.
    pub fn load(&self) -> Result<ProjectionTable<LineBuffer>, Box<dyn Error>> {
        let text = fs::read_to_string(&self.file)
            .map_err(|e| format!("failed to read {}: {}", self.file.display(), e))?;
        let buffer = LineBuffer::from_text(&text).with_tab_size(self.tab_size);
        let mut table = ProjectionTable::new(buffer, self.settings(), self.tab_size);
        table.set_hidden_areas(&self.fold)?;
        debug!(
            file = %self.file.display(),
            view_lines = table.view_line_count(),
            "loaded file"
        );
        Ok(table)
    }
}
