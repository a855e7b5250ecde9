//! Diagnostics: the alert taxonomy and caret-style rendering.
//!
//! Alerts are appended to the program's lists and never raised across pass
//! boundaries. Rendering is pulled by the embedder; the core writes nothing
//! to stdout or stderr.

use crate::source::{SourceMap, Span};
use crate::style::Style;

/// The closed taxonomy of diagnostic kinds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AlertKind {
    SyntaxError,
    ResolutionError,
    DuplicateDefinition,
    UnmatchedImpl,
    Cancelled,
    InternalError,
    Warning,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::SyntaxError => "SyntaxError",
            AlertKind::ResolutionError => "ResolutionError",
            AlertKind::DuplicateDefinition => "DuplicateDefinition",
            AlertKind::UnmatchedImpl => "UnmatchedImpl",
            AlertKind::Cancelled => "Cancelled",
            AlertKind::InternalError => "InternalError",
            AlertKind::Warning => "Warning",
        }
    }

    pub fn is_error(self) -> bool {
        !matches!(self, AlertKind::Warning)
    }
}

/// One diagnostic: kind, message, location, optional hint.
#[derive(Clone, Debug)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub span: Span,
    pub hint: Option<String>,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>, span: Span) -> Self {
        Alert {
            kind,
            message: message.into(),
            span,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// `kind, file, line:col, message` single-line form.
    pub fn brief(&self, sources: &SourceMap) -> String {
        match sources.try_get(self.span.src) {
            Some(src) => {
                let (line, col) = src.position(self.span.start as usize);
                format!(
                    "{}: {}:{}:{}: {}",
                    self.kind.as_str(),
                    src.path().display(),
                    line,
                    col,
                    self.message
                )
            }
            None => format!("{}: {}", self.kind.as_str(), self.message),
        }
    }

    /// Multi-line rendering with the offending line and a caret underline.
    pub fn display_with_source(&self, sources: &SourceMap) -> String {
        let Some(src) = sources.try_get(self.span.src) else {
            return self.message.clone();
        };
        let (line_num, col) = src.position(self.span.start as usize);
        let line_content = src.line_text(line_num);
        let len = self.span.len().max(1).min(line_content.len().max(1));
        let underline = format!("{}{}", " ".repeat(col.saturating_sub(1)), "^".repeat(len));

        let label = if self.kind.is_error() {
            Style::bold_red("error")
        } else {
            Style::yellow("warning")
        };
        let line_num_str = Style::blue(&format!("{:4}", line_num));
        let pipe = Style::blue("|");
        let underline_colored = Style::red(&underline);

        let mut result = format!(
            "{}[{}]: {}\n  --> {}:{}:{}\n{} {} {}\n     {} {}",
            label,
            self.kind.as_str(),
            self.message,
            src.path().display(),
            line_num,
            col,
            line_num_str,
            pipe,
            line_content,
            pipe,
            underline_colored
        );
        if let Some(hint) = &self.hint {
            let help = Style::cyan("help");
            result.push_str(&format!("\n     {} {}: {}", pipe, help, hint));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Source, SourceId};

    fn map_with(text: &str) -> SourceMap {
        let mut map = SourceMap::new();
        map.add(Source::new(text, "t.jac"));
        map
    }

    #[test]
    fn brief_carries_location() {
        let map = map_with("obj Foo {\n  bad here\n}");
        let alert = Alert::new(
            AlertKind::SyntaxError,
            "unexpected token",
            Span::new(SourceId(0), 12, 15),
        );
        let s = alert.brief(&map);
        assert!(s.starts_with("SyntaxError: "));
        assert!(s.contains("t.jac:2:3"));
        assert!(s.contains("unexpected token"));
    }

    #[test]
    fn display_underlines_the_span() {
        let map = map_with("x = $;");
        let alert = Alert::new(
            AlertKind::SyntaxError,
            "unknown character",
            Span::new(SourceId(0), 4, 5),
        );
        let s = alert.display_with_source(&map);
        assert!(s.contains("x = $;"));
        assert!(s.contains('^'));
    }

    #[test]
    fn hint_is_appended() {
        let map = map_with("imp x;");
        let alert = Alert::new(
            AlertKind::SyntaxError,
            "unknown statement",
            Span::new(SourceId(0), 0, 3),
        )
        .with_hint("did you mean 'import'?");
        let s = alert.display_with_source(&map);
        assert!(s.contains("did you mean 'import'?"));
    }

    #[test]
    fn warning_kind_is_not_error() {
        assert!(!AlertKind::Warning.is_error());
        assert!(AlertKind::Cancelled.is_error());
    }
}
