use crate::cli::RenderArgs;
use std::{error::Error, io::Write};
use viewlines::{GuideSource, ProjectionTable, TextModel};

pub fn run(args: RenderArgs) -> Result<(), Box<dyn Error>> {
    let table = args.view.load()?;
    let stdout = std::io::stdout();
    write_view(&table, args.guides, &mut stdout.lock())
}

/// Write one row per view line: view line, `model:row`, then the content.
pub fn write_view<M: TextModel + GuideSource>(
    table: &ProjectionTable<M>,
    guides: bool,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let count = table.view_line_count();
    let levels = if guides {
        table.guides().indent_guides(1, count)
    } else {
        Vec::new()
    };

    for view_line in 1..=count {
        let info = table.view_line_info(view_line);
        let content = table.view_line_content(view_line)?;
        write!(out, "{:>5}  {:>5}:{:<3}", view_line, info.model_line, info.row)?;
        if let Some(level) = levels.get(view_line as usize - 1) {
            write!(out, " {}", level)?;
        }
        writeln!(out, " |{}", content)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewlines::{LineBuffer, LineRange, WrapSettings, WrappingIndent};

    fn render(text: &str, settings: WrapSettings, folds: &[LineRange], guides: bool) -> String {
        let mut table = ProjectionTable::new(LineBuffer::from_text(text), settings, 4);
        table.set_hidden_areas(folds).unwrap();
        let mut out = Vec::new();
        write_view(&table, guides, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn renders_wrapped_and_folded_lines() {
        let settings = WrapSettings {
            wrapping_indent: WrappingIndent::None,
            ..WrapSettings::wrapped_at(8)
        };
        let output = render("hello world foo\nhidden\nend", settings, &[LineRange::new(2, 2)], false);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "    1      1:0   |hello ",
                "    2      1:1   |world ",
                "    3      1:2   |foo",
                "    4      3:0   |end",
            ]
        );
    }

    #[test]
    fn renders_guide_levels() {
        let output = render("{\n    a\n}", WrapSettings::default(), &[], true);
        let levels: Vec<&str> = output
            .lines()
            .map(|line| line.split_whitespace().nth(2).unwrap_or(""))
            .collect();
        assert_eq!(levels, vec!["0", "1", "0"]);
    }
}
