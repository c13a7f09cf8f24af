//! Line breaking for monospace fonts.
//!
//! Every character is measured in columns: one for half-width characters, the
//! font's full-width ratio for CJK and other wide characters, and up to
//! `tab_size` for tabs. Rows break at the last break opportunity that fits,
//! or mid-word when a row has none.

use crate::{
    injected_text::apply_injections,
    line_break::{LineBreakData, LineBreakRequest, LineBreaksComputer},
    settings::{WrapSettings, WrappingIndent},
};
use tracing::trace;

/// Characters after which a row may end.
const BREAK_AFTER: &str = " \t})]?|/&.,;¢°′″‰℃、。｡､￠，．：；？！％・･ゝゞヽヾーァィゥェォッャュョヮヵヶぁぃぅぇぉっゃゅょゎゕゖ々〻ｧｨｩｪｫｬｭｮｯｰ”〉》」』】〕）］｝｣";

/// Characters before which a row may end.
const BREAK_BEFORE: &str = "([{‘“〈《「『【〔（［｛｢£¥＄￡￥+＋";

#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceLineBreaksComputer;

impl MonospaceLineBreaksComputer {
    pub fn new() -> Self {
        Self
    }
}

impl LineBreaksComputer for MonospaceLineBreaksComputer {
    fn compute(
        &self,
        settings: &WrapSettings,
        tab_size: u32,
        requests: Vec<LineBreakRequest>,
    ) -> Vec<Option<LineBreakData>> {
        let tab_size = tab_size.max(1);
        let full_width = settings.font.full_width_columns();
        requests
            .into_iter()
            .map(|request| {
                let text = apply_injections(&request.text, &request.injections);
                let chars: Vec<char> = text.chars().collect();
                let layout = Layout {
                    chars: &chars,
                    tab_size,
                    full_width,
                };
                match settings.wrapping_column {
                    Some(column) => {
                        layout.wrap(column.max(1), settings.wrapping_indent, request)
                    },
                    None => layout.unwrapped(request),
                }
            })
            .collect()
    }
}

struct Layout<'a> {
    chars: &'a [char],
    tab_size: u32,
    full_width: u32,
}

impl Layout<'_> {
    fn char_width(&self, ch: char, visible_column: u32) -> u32 {
        if ch == '\t' {
            self.tab_size - visible_column % self.tab_size
        } else if is_full_width(ch) {
            self.full_width
        } else {
            1
        }
    }

    /// Visible column of every offset, `chars.len() + 1` entries.
    fn visible_columns(&self) -> Vec<u32> {
        let mut columns = Vec::with_capacity(self.chars.len() + 1);
        let mut column = 0;
        columns.push(column);
        for &ch in self.chars {
            column += self.char_width(ch, column);
            columns.push(column);
        }
        columns
    }

    fn unwrapped(&self, request: LineBreakRequest) -> Option<LineBreakData> {
        if request.injections.is_empty() {
            return None;
        }
        let len = self.chars.len() as u32;
        let visible = self.visible_columns();
        Some(LineBreakData::new(
            request.injections,
            vec![len],
            vec![visible[self.chars.len()]],
            0,
        ))
    }

    fn indent_length(&self, mode: WrappingIndent, wrapping_column: u32) -> u32 {
        if mode == WrappingIndent::None {
            return 0;
        }
        let Some(first_content) = self.chars.iter().position(|ch| !matches!(ch, ' ' | '\t')) else {
            return 0;
        };

        let mut indent = 0;
        for &ch in &self.chars[..first_content] {
            indent += self.char_width(ch, indent);
        }
        indent += match mode {
            WrappingIndent::Indent => self.tab_size,
            WrappingIndent::DeepIndent => self.tab_size * 2,
            WrappingIndent::None | WrappingIndent::Same => 0,
        };

        // A continuation row must keep at least one column for text.
        if indent + 1 >= wrapping_column {
            0
        } else {
            indent
        }
    }

    fn can_break_between(prev: char, next: char) -> bool {
        BREAK_AFTER.contains(prev)
            || BREAK_BEFORE.contains(next)
            || ((is_full_width(prev) || is_full_width(next)) && !BREAK_AFTER.contains(next))
    }

    fn wrap(
        &self,
        wrapping_column: u32,
        indent_mode: WrappingIndent,
        request: LineBreakRequest,
    ) -> Option<LineBreakData> {
        let visible = self.visible_columns();
        let len = self.chars.len();
        if visible[len] <= wrapping_column {
            return self.unwrapped(request);
        }

        let indent = self.indent_length(indent_mode, wrapping_column);
        let first_content = self
            .chars
            .iter()
            .position(|ch| !matches!(ch, ' ' | '\t'))
            .unwrap_or(len);
        let mut break_offsets = Vec::new();
        let mut break_columns = Vec::new();

        let mut row_start = 0;
        let mut column = 0;
        let mut opportunity = None;
        let mut offset = 0;
        while offset < len {
            let ch = self.chars[offset];
            // leading whitespace is never a row on its own
            if offset > row_start
                && offset > first_content
                && Self::can_break_between(self.chars[offset - 1], ch)
            {
                opportunity = Some(offset);
            }

            let width = self.char_width(ch, column);
            if offset > row_start && column + width > wrapping_column {
                let break_at = opportunity.unwrap_or(offset);
                break_offsets.push(break_at as u32);
                break_columns.push(visible[break_at]);
                row_start = break_at;
                offset = break_at;
                column = indent;
                opportunity = None;
                continue;
            }

            column += width;
            offset += 1;
        }
        break_offsets.push(len as u32);
        break_columns.push(visible[len]);

        trace!(rows = break_offsets.len(), indent, "wrapped line");
        Some(LineBreakData::new(
            request.injections,
            break_offsets,
            break_columns,
            indent,
        ))
    }
}

fn is_full_width(ch: char) -> bool {
    matches!(
        ch as u32,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x20000..=0x3FFFD
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injected_text::{InjectedTextOptions, Injection};

    fn break_line(text: &str, settings: &WrapSettings) -> Option<LineBreakData> {
        MonospaceLineBreaksComputer::new()
            .compute(settings, 4, vec![LineBreakRequest::new(text)])
            .pop()
            .flatten()
    }

    fn no_indent(column: u32) -> WrapSettings {
        WrapSettings {
            wrapping_indent: WrappingIndent::None,
            ..WrapSettings::wrapped_at(column)
        }
    }

    #[test]
    fn short_line_needs_no_data() {
        assert!(break_line("abc", &no_indent(10)).is_none());
        assert!(break_line("abc", &WrapSettings::default()).is_none());
    }

    #[test]
    fn breaks_after_spaces() {
        let data = break_line("hello world foo", &no_indent(8)).unwrap();
        assert_eq!(data.break_offsets, vec![6, 12, 15]);
        assert_eq!(data.wrapped_text_indent_length, 0);
    }

    #[test]
    fn forced_break_without_opportunity() {
        let data = break_line("abcdefgh", &no_indent(3)).unwrap();
        assert_eq!(data.break_offsets, vec![3, 6, 8]);
    }

    #[test]
    fn same_indent_carries_leading_whitespace() {
        let data = break_line("  aaaa bbbb", &WrapSettings::wrapped_at(8)).unwrap();
        assert_eq!(data.wrapped_text_indent_length, 2);
        assert_eq!(data.break_offsets, vec![7, 11]);
    }

    #[test]
    fn deep_indent_dropped_when_too_wide() {
        let settings = WrapSettings {
            wrapping_indent: WrappingIndent::DeepIndent,
            ..WrapSettings::wrapped_at(6)
        };
        let data = break_line("  aaaaaaaaa", &settings).unwrap();
        assert_eq!(data.wrapped_text_indent_length, 0);
    }

    #[test]
    fn full_width_characters_take_two_columns() {
        let data = break_line("日本語です", &no_indent(4)).unwrap();
        assert_eq!(data.break_offsets, vec![2, 4, 5]);
        assert_eq!(data.break_offsets_visible_column, vec![4, 8, 10]);
    }

    #[test]
    fn injected_text_without_wrapping() {
        let mut request = LineBreakRequest::new("ab");
        request.injections = vec![Injection::new(1, InjectedTextOptions::new("::"))];
        let data = MonospaceLineBreaksComputer::new()
            .compute(&WrapSettings::default(), 4, vec![request])
            .pop()
            .flatten()
            .unwrap();
        assert_eq!(data.break_offsets, vec![4]);
        assert!(data.has_injections());
    }
}
