//! Source spans with byte offsets and 1-indexed line/column positions.

use serde::{Deserialize, Serialize};

/// Source code span with byte offsets and 1-indexed line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        start_line: usize,
        end_line: usize,
        start_column: usize,
        end_column: usize,
    ) -> Self {
        Self {
            start,
            end,
            start_line,
            end_line,
            start_column,
            end_column,
        }
    }

    /// A zero-width span at the very start of a source file.
    pub fn at_start() -> Self {
        Self::new(0, 0, 1, 1, 1, 1)
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Maps byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct SourceMap {
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(memchr::memchr_iter(b'\n', source.as_bytes()).map(|i| i + 1));
        Self { line_starts }
    }

    /// 1-indexed (line, column) for a byte offset.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }

    /// Build a span from a byte range.
    pub fn span(&self, start: usize, end: usize) -> Span {
        let (start_line, start_column) = self.position(start);
        let (end_line, end_column) = self.position(end);
        Span::new(start, end, start_line, end_line, start_column, end_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn position_tracks_lines_and_columns() {
        let map = SourceMap::new("int x;\nx = 1;\n");
        assert_eq!(map.position(0), (1, 1));
        assert_eq!(map.position(4), (1, 5));
        assert_eq!(map.position(7), (2, 1));
        assert_eq!(map.position(11), (2, 5));
    }

    #[test]
    fn span_covers_token_text() {
        let src = "while (x)";
        let map = SourceMap::new(src);
        let span = map.span(0, 5);
        assert_eq!(span.text(src), "while");
        assert_eq!(span.start_line, 1);
        assert_eq!(span.start_column, 1);
        assert_eq!(span.end_column, 6);
    }
}
