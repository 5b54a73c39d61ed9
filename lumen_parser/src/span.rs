//! Source locations for tokens, AST nodes and diagnostics.

use serde::{Deserialize, Serialize};

/// A region of source code, identified by byte offsets plus the line and
/// column of its start (both 1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset start (0-indexed)
    pub start: usize,
    /// Byte offset end (exclusive)
    pub end: usize,
    /// Line of the start offset (1-indexed)
    pub line: usize,
    /// Column of the start offset (1-indexed, in bytes)
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// An empty span at the start of the source
    pub fn empty() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }

    /// Cover both `self` and `other`. The earlier span supplies line/column.
    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if self.start <= other.start {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Maps byte offsets back to lines for span construction and for rendering
/// the offending line in diagnostics.
#[derive(Debug, Clone)]
pub struct SourceMap {
    /// Byte offsets at which each line starts
    line_starts: Vec<usize>,
    source_len: usize,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            source_len: source.len(),
        }
    }

    /// Line and column (both 1-indexed) of a byte offset
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        (line + 1, offset - line_start + 1)
    }

    /// Build a span with line/column information from byte offsets
    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.line_col(start);
        Span {
            start,
            end,
            line,
            column,
        }
    }

    /// Byte range of the given 1-indexed line, without its newline
    pub fn line_range(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next.saturating_sub(1))
            .unwrap_or(self.source_len);
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let map = SourceMap::new("var x := 1\nvar y := 2\n");
        assert_eq!(map.line_col(0), (1, 1));
        assert_eq!(map.line_col(4), (1, 5));
        assert_eq!(map.line_col(11), (2, 1));
        assert_eq!(map.line_col(15), (2, 5));
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(0, 3, 1, 1);
        let b = Span::new(8, 12, 2, 3);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, 12);
        assert_eq!(merged.line, 1);
        assert_eq!(merged.column, 1);
    }

    #[test]
    fn test_line_range() {
        let map = SourceMap::new("abc\ndefg");
        assert_eq!(map.line_range(1), Some((0, 3)));
        assert_eq!(map.line_range(2), Some((4, 8)));
        assert_eq!(map.line_range(3), None);
    }

    #[test]
    fn test_line_range_trailing_newline() {
        let map = SourceMap::new("abc\n");
        assert_eq!(map.line_range(1), Some((0, 3)));
    }
}
