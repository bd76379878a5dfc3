use serde::{Deserialize, Serialize};

/// Kind of an inline span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Code,
    Bold,
    Italic,
    PlainRun,
}

/// Inline span within one line, delimiters stripped.
///
/// `start..end` is a byte range into the line's plain (de-delimited) text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Column alignment from a table separator row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// A parsed pipe table that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    pub headers: Vec<String>,
    pub alignments: Vec<Alignment>,
    pub rows: Vec<Vec<String>>,
    /// 1-based source line of the header row.
    pub source_line: usize,
    /// Position of the table's placeholder line in the document.
    pub insertion_index: usize,
}

impl TableSpec {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Rows including the header row.
    pub fn row_count(&self) -> usize {
        self.rows.len() + 1
    }

    /// Every cell in row-major order, header row first, as `(row, column, text)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &str)> {
        std::iter::once(&self.headers)
            .chain(self.rows.iter())
            .enumerate()
            .flat_map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .map(move |(column, text)| (row, column, text.as_str()))
            })
    }
}

/// Paragraph style names the document service knows about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NamedStyle {
    #[default]
    NormalText,
    #[serde(rename = "HEADING_1")]
    Heading1,
    #[serde(rename = "HEADING_2")]
    Heading2,
    #[serde(rename = "HEADING_3")]
    Heading3,
    /// Any style this crate does not produce (titles, deeper headings).
    #[serde(other)]
    Other,
}

impl NamedStyle {
    pub fn heading(level: u8) -> Option<Self> {
        match level {
            1 => Some(NamedStyle::Heading1),
            2 => Some(NamedStyle::Heading2),
            3 => Some(NamedStyle::Heading3),
            _ => None,
        }
    }

    pub fn heading_level(self) -> Option<u8> {
        match self {
            NamedStyle::Heading1 => Some(1),
            NamedStyle::Heading2 => Some(2),
            NamedStyle::Heading3 => Some(3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Numbered,
}

/// Line-level elements parsed from markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Blank,
    Heading { level: u8, text: String },
    BulletItem(String),
    NumberedItem(String),
    Table(TableSpec),
    Paragraph(String),
}

/// A block together with the 1-based source line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBlock {
    pub line: usize,
    pub block: Block,
}
