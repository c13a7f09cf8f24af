//! Synthetic text spliced into a model line for display.

use serde::{Deserialize, Serialize};

/// Content and styling of one injected text run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InjectedTextOptions {
    pub content: String,
    /// Class applied to the run as an inline decoration.
    pub inline_class_name: Option<String>,
    pub affects_letter_spacing: bool,
}

impl InjectedTextOptions {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.inline_class_name = Some(class_name.into());
        self
    }

    /// Length of the content in columns.
    pub fn len(&self) -> u32 {
        self.content.chars().count() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Injected text anchored at a model position, as reported by the text model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInjectedText {
    pub line: u32,
    /// Model column the run is inserted before.
    pub column: u32,
    pub options: InjectedTextOptions,
    /// Tie-break between runs at the same column, lower first.
    pub order: u32,
}

impl LineInjectedText {
    pub fn new(line: u32, column: u32, options: InjectedTextOptions, order: u32) -> Self {
        Self {
            line,
            column,
            options,
            order,
        }
    }

    pub fn sort(texts: &mut [LineInjectedText]) {
        texts.sort_by_key(|text| (text.line, text.column, text.order));
    }
}

/// An injected run positioned on its own line by a 0-based model offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub offset: u32,
    pub options: InjectedTextOptions,
}

impl Injection {
    pub fn new(offset: u32, options: InjectedTextOptions) -> Self {
        Self { offset, options }
    }

    /// Collect the runs of `line` from a list sorted by [`LineInjectedText::sort`].
    pub fn for_line(texts: &[LineInjectedText], line: u32) -> Vec<Injection> {
        texts
            .iter()
            .filter(|text| text.line == line)
            .cloned()
            .map(Injection::from)
            .collect()
    }
}

impl From<LineInjectedText> for Injection {
    fn from(text: LineInjectedText) -> Self {
        Injection::new(text.column.saturating_sub(1), text.options)
    }
}

/// Splice `injections` into `text`.
///
/// Injections must be ordered by offset. Offsets past the end of `text` are
/// appended at the end.
pub fn apply_injections(text: &str, injections: &[Injection]) -> String {
    if injections.is_empty() {
        return text.to_string();
    }

    let extra: usize = injections.iter().map(|i| i.options.content.len()).sum();
    let mut result = String::with_capacity(text.len() + extra);
    let mut pending = injections.iter().peekable();

    for (offset, ch) in text.chars().enumerate() {
        while let Some(injection) = pending.next_if(|i| i.offset as usize <= offset) {
            result.push_str(&injection.options.content);
        }
        result.push(ch);
    }
    for injection in pending {
        result.push_str(&injection.options.content);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splices_in_order() {
        let injections = vec![
            Injection::new(0, InjectedTextOptions::new(">")),
            Injection::new(2, InjectedTextOptions::new(": u32")),
            Injection::new(2, InjectedTextOptions::new("!")),
        ];
        assert_eq!(apply_injections("ab", &injections), ">ab: u32!");
        assert_eq!(apply_injections("abc", &injections), ">ab: u32!c");
    }

    #[test]
    fn collects_runs_for_one_line() {
        let mut texts = vec![
            LineInjectedText::new(2, 4, InjectedTextOptions::new("b"), 1),
            LineInjectedText::new(1, 1, InjectedTextOptions::new("x"), 0),
            LineInjectedText::new(2, 4, InjectedTextOptions::new("a"), 0),
        ];
        LineInjectedText::sort(&mut texts);

        let runs = Injection::for_line(&texts, 2);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].offset, 3);
        assert_eq!(runs[0].options.content, "a");
        assert_eq!(runs[1].options.content, "b");
    }
}
