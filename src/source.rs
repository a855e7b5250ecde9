//! Source buffers and byte-addressed location tracking.
//!
//! Every token and AST node carries a [`Span`] into exactly one registered
//! [`Source`]. Line/column conversion is lazy: diagnostics are the only
//! consumer, so the line table is built on first use.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

/// Index of a source buffer inside a [`SourceMap`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct SourceId(pub u32);

/// A half-open byte range `[start, end)` into one source buffer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Span {
    pub src: SourceId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(src: SourceId, start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Span {
            src,
            start: start as u32,
            end: end as u32,
        }
    }

    /// Smallest span covering both `self` and `other`.
    /// Both spans must index the same source.
    pub fn join(self, other: Span) -> Span {
        debug_assert_eq!(self.src, other.src);
        Span {
            src: self.src,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

/// An immutable source file: text plus module path.
pub struct Source {
    text: String,
    path: PathBuf,
    line_starts: OnceCell<Vec<u32>>,
}

impl Source {
    pub fn new(text: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Source {
            text: text.into(),
            path: path.into(),
            line_starts: OnceCell::new(),
        }
    }

    /// Read a file as UTF-8, replacing invalid sequences.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Source::new(text, path))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The text under `span`. The span must have been produced from this
    /// buffer; out-of-range spans yield an empty slice rather than a panic.
    pub fn slice(&self, span: Span) -> &str {
        self.text
            .get(span.start as usize..span.end as usize)
            .unwrap_or("")
    }

    fn line_starts(&self) -> &[u32] {
        self.line_starts.get_or_init(|| {
            let mut starts = vec![0u32];
            for (i, b) in self.text.bytes().enumerate() {
                if b == b'\n' {
                    starts.push(i as u32 + 1);
                }
            }
            starts
        })
    }

    /// 1-based (line, column) of a byte offset.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len()) as u32;
        let starts = self.line_starts();
        let line = match starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line + 1, (offset - starts[line]) as usize + 1)
    }

    /// Full text of a 1-based line, without its trailing newline.
    pub fn line_text(&self, line: usize) -> &str {
        let starts = self.line_starts();
        if line == 0 || line > starts.len() {
            return "";
        }
        let start = starts[line - 1] as usize;
        let end = starts
            .get(line)
            .map(|s| *s as usize - 1)
            .unwrap_or(self.text.len());
        &self.text[start..end.max(start)]
    }
}

/// Registry of every source buffer a program has seen.
#[derive(Default)]
pub struct SourceMap {
    sources: Vec<Source>,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap::default()
    }

    pub fn add(&mut self, source: Source) -> SourceId {
        let id = SourceId(self.sources.len() as u32);
        self.sources.push(source);
        id
    }

    pub fn get(&self, id: SourceId) -> &Source {
        &self.sources[id.0 as usize]
    }

    pub fn try_get(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_is_one_based() {
        let src = Source::new("ab\ncd\n", "test.jac");
        assert_eq!(src.position(0), (1, 1));
        assert_eq!(src.position(1), (1, 2));
        assert_eq!(src.position(3), (2, 1));
        assert_eq!(src.position(4), (2, 2));
    }

    #[test]
    fn position_past_end_clamps() {
        let src = Source::new("abc", "test.jac");
        assert_eq!(src.position(99), (1, 4));
    }

    #[test]
    fn slice_returns_span_text() {
        let src = Source::new("obj Foo {}", "test.jac");
        let span = Span::new(SourceId(0), 4, 7);
        assert_eq!(src.slice(span), "Foo");
    }

    #[test]
    fn slice_out_of_range_is_empty() {
        let src = Source::new("x", "test.jac");
        assert_eq!(src.slice(Span::new(SourceId(0), 0, 50)), "");
    }

    #[test]
    fn line_text_strips_newline() {
        let src = Source::new("first\nsecond\n", "test.jac");
        assert_eq!(src.line_text(1), "first");
        assert_eq!(src.line_text(2), "second");
        assert_eq!(src.line_text(3), "");
    }

    #[test]
    fn join_covers_both_spans() {
        let a = Span::new(SourceId(0), 2, 5);
        let b = Span::new(SourceId(0), 8, 10);
        let j = a.join(b);
        assert_eq!((j.start, j.end), (2, 10));
    }

    #[test]
    fn empty_file_has_one_line() {
        let src = Source::new("", "empty.jac");
        assert_eq!(src.position(0), (1, 1));
        assert_eq!(src.line_text(1), "");
    }
}
