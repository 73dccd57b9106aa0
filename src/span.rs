/// Span tracking for positions inside JSON documents (definitions, transport bodies)
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Represents a span in a source document (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Locate the byte offset of a 1-based `line`/`column` pair, as reported by
    /// `serde_json`, and return a one character span there.
    ///
    /// Positions past the end of the source are clamped to the last byte, so the
    /// span is always usable as a label range.
    pub fn from_line_column(source: &str, line: usize, column: usize) -> Self {
        let mut offset = 0;
        for (index, text) in source.split_inclusive('\n').enumerate() {
            if index + 1 == line {
                let within = column.saturating_sub(1).min(text.len());
                offset += within;
                break;
            }
            offset += text.len();
        }
        let start = offset.min(source.len().saturating_sub(1));
        let end = (start + 1).min(source.len());
        Span { start, end }
    }

    /// Span of the first occurrence of `needle` as a quoted JSON string
    pub fn find_quoted(source: &str, needle: &str) -> Option<Self> {
        let quoted = format!("\"{}\"", needle);
        source
            .find(&quoted)
            .map(|start| Span::new(start, start + quoted.len()))
    }

    /// Convert to a Range for use with ariadne
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Create a dummy span (used when no position is known)
    pub fn dummy() -> Self {
        Span { start: 0, end: 0 }
    }
}
