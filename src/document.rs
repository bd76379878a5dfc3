//! The remote document as returned by the document service.
//!
//! Only the parts this crate reads are modelled; unknown fields are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::{ListKind, NamedStyle};
use crate::directive::{TableCellStyle, TextStyle};
use crate::error::AddressError;
use crate::offset::TextRange;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Body,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lists: BTreeMap<String, List>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralElement {
    /// Absent on the section break that opens a body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default)]
    pub end_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<Paragraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_break: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    #[serde(default)]
    pub elements: Vec<ParagraphElement>,
    #[serde(default)]
    pub paragraph_style: ParagraphStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet: Option<Bullet>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    #[serde(default)]
    pub named_style_type: NamedStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bullet {
    pub list_id: String,
    #[serde(default)]
    pub nesting_level: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default)]
    pub end_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub text_style: TextStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default)]
    pub rows: usize,
    #[serde(default)]
    pub columns: usize,
    #[serde(default)]
    pub table_rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default)]
    pub end_index: usize,
    #[serde(default)]
    pub table_cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default)]
    pub end_index: usize,
    #[serde(default)]
    pub content: Vec<StructuralElement>,
    #[serde(default)]
    pub table_cell_style: TableCellStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    #[serde(default)]
    pub list_properties: ListProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProperties {
    #[serde(default)]
    pub nesting_levels: Vec<NestingLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestingLevel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glyph_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glyph_symbol: Option<String>,
}

/// Glyph types that render as a counter rather than a symbol.
const NUMBERED_GLYPHS: &[&str] = &[
    "DECIMAL",
    "ZERO_DECIMAL",
    "ALPHA",
    "UPPER_ALPHA",
    "ROMAN",
    "UPPER_ROMAN",
];

impl Document {
    /// Index just past the last element of the body.
    pub fn end_index(&self) -> usize {
        self.body.content.last().map_or(1, |e| e.end_index)
    }

    /// All text in document order, table cells included.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.body.content, &mut out);
        out
    }

    /// Locate the first occurrence of `needle` and return its document range.
    ///
    /// Matches never span a structural boundary (a table edge or cell edge).
    pub fn find_text(&self, needle: &str) -> Option<TextRange> {
        let needle: Vec<u16> = needle.encode_utf16().collect();
        if needle.is_empty() {
            return None;
        }

        let mut units = Vec::new();
        let mut indices = Vec::new();
        collect_units(&self.body.content, &mut units, &mut indices);

        (0..units.len().saturating_sub(needle.len() - 1))
            .find(|&at| {
                units[at..at + needle.len()] == needle[..]
                    && indices[at + needle.len() - 1] == indices[at] + needle.len() - 1
            })
            .map(|at| TextRange::new(indices[at], indices[at] + needle.len()))
    }

    /// The table whose element starts exactly at `start_index`.
    pub fn table_at(&self, start_index: usize) -> Option<&Table> {
        self.body
            .content
            .iter()
            .filter(|e| e.start_index == Some(start_index))
            .find_map(|e| e.table.as_ref())
    }

    /// List kind of a bulleted paragraph, from the list's glyph at its nesting level.
    pub fn list_kind(&self, bullet: &Bullet) -> ListKind {
        let glyph_type = self
            .lists
            .get(&bullet.list_id)
            .and_then(|list| list.list_properties.nesting_levels.get(bullet.nesting_level))
            .and_then(|level| level.glyph_type.as_deref());

        match glyph_type {
            Some(glyph) if NUMBERED_GLYPHS.contains(&glyph) => ListKind::Numbered,
            _ => ListKind::Bullet,
        }
    }
}

impl Table {
    /// Start index of the first paragraph inside cell `(row, column)`.
    pub fn cell_content_start(&self, row: usize, column: usize) -> Result<usize, AddressError> {
        let cell = self
            .table_rows
            .get(row)
            .and_then(|r| r.table_cells.get(column))
            .ok_or(AddressError::CellOutOfRange { row, column })?;

        cell.content
            .first()
            .filter(|e| e.paragraph.is_some())
            .and_then(|e| e.start_index)
            .ok_or(AddressError::EmptyCell { row, column })
    }
}

fn collect_text(elements: &[StructuralElement], out: &mut String) {
    for element in elements {
        if let Some(paragraph) = &element.paragraph {
            for run in paragraph.elements.iter().filter_map(|e| e.text_run.as_ref()) {
                out.push_str(&run.content);
            }
        } else if let Some(table) = &element.table {
            for cell in table.table_rows.iter().flat_map(|r| &r.table_cells) {
                collect_text(&cell.content, out);
            }
        }
    }
}

fn collect_units(elements: &[StructuralElement], units: &mut Vec<u16>, indices: &mut Vec<usize>) {
    for element in elements {
        if let Some(paragraph) = &element.paragraph {
            for el in &paragraph.elements {
                let (Some(start), Some(run)) = (el.start_index, &el.text_run) else {
                    continue;
                };
                for (offset, unit) in run.content.encode_utf16().enumerate() {
                    units.push(unit);
                    indices.push(start + offset);
                }
            }
        } else if let Some(table) = &element.table {
            for cell in table.table_rows.iter().flat_map(|r| &r.table_cells) {
                collect_units(&cell.content, units, indices);
            }
        }
    }
}
