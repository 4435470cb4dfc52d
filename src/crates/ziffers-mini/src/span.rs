use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Byte range of a node in the notation text.
///
/// The parser compares spans to tell `^0` from `^ 0`; evaluation keys cycle
/// positions by `start`, so two `<..>` groups never share a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Smallest span covering both
    pub fn merge(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// `next` starts where this span ends, with no whitespace between
    pub fn touches(&self, next: Span) -> bool {
        self.end == next.start
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// 1-based line and column of `start` in `source`
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let before = &source[..self.start.min(source.len())];
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        (line, column)
    }

    /// The source line holding this span with a marker underneath it
    pub fn excerpt(&self, source: &str) -> String {
        let (line, column) = self.line_col(source);
        let text = source.lines().nth(line - 1).unwrap_or_default();
        let width = source
            .get(self.to_range())
            .map_or(1, |s| s.chars().take_while(|c| *c != '\n').count().max(1));
        format!("{}\n{}{}", text, " ".repeat(column - 1), "^".repeat(width))
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        assert_eq!(Span::new(0, 5).merge(Span::new(3, 10)), Span::new(0, 10));
        assert_eq!(Span::new(4, 6).merge(Span::new(0, 1)), Span::new(0, 6));
    }

    #[test]
    fn test_span_touches() {
        assert!(Span::new(0, 3).touches(Span::new(3, 4)));
        assert!(!Span::new(0, 3).touches(Span::new(4, 5)));
    }

    #[test]
    fn test_line_col() {
        let source = "0 1 2\nq 3 [4";
        assert_eq!(Span::new(2, 3).line_col(source), (1, 3));
        assert_eq!(Span::new(10, 11).line_col(source), (2, 5));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(Span::new(4, 7).excerpt("0 1 [2 3"), "0 1 [2 3\n    ^^^");
        assert_eq!(Span::new(2, 2).excerpt("0 1"), "0 1\n  ^");
    }
}
