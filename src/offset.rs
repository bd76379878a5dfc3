//! Offset model shared by the compiler and the table protocol.
//!
//! Document positions are 1-based and counted in UTF-16 code units, the unit
//! the remote document uses. Every emitted line is followed by one implicit
//! line terminator, so a line of length `n` occupies `n + 1` positions.

use serde::{Deserialize, Serialize};

/// Length of `text` in document units.
pub fn doc_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Half-open `[start, end)` range of document positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    #[serde(rename = "startIndex")]
    pub start: usize,
    #[serde(rename = "endIndex")]
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

/// Where one emitted line lands in the document.
///
/// Obtained from [`Cursor::place`] and consumed by [`Cursor::advance`], so a
/// placement can only describe the line it was taken for: directives are
/// built from it first, and once the cursor moves on it is gone.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a placement must be handed back to Cursor::advance"]
pub struct Placement {
    range: TextRange,
}

impl Placement {
    pub fn start(&self) -> usize {
        self.range.start
    }

    pub fn end(&self) -> usize {
        self.range.end
    }

    /// The emitted line, excluding its terminator.
    pub fn range(&self) -> TextRange {
        self.range
    }
}

/// Monotonically advancing write position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    position: usize,
}

impl Cursor {
    pub fn new(start: usize) -> Self {
        Self { position: start }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Place `line` at the current position without moving.
    pub fn place(&self, line: &str) -> Placement {
        Placement {
            range: TextRange::new(self.position, self.position + doc_len(line)),
        }
    }

    /// Move past a placed line and its terminator.
    pub fn advance(&mut self, placement: Placement) {
        debug_assert_eq!(placement.range.start, self.position);
        self.position = placement.range.end + 1;
    }
}
