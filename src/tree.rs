//! Read-side model of a document: styled runs grouped into paragraphs and
//! table cells.

use crate::block::{ListKind, NamedStyle};
use crate::config::StyleConfig;
use crate::document::{self, Document, StructuralElement};
use crate::error::TreeShapeError;

/// A piece of text with uniform styling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphNode {
    pub style: NamedStyle,
    pub list: Option<ListKind>,
    /// Runs in order. Text may contain line breaks; each one ends a line.
    pub runs: Vec<Run>,
}

/// Row-major cells, each an ordered list of runs without line breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNode {
    pub rows: Vec<Vec<Vec<Run>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Paragraph(ParagraphNode),
    Table(TableNode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTree {
    pub nodes: Vec<Node>,
}

impl DocumentTree {
    /// Build the tree from a fetched document. Runs set in `styles.code_font`
    /// are marked as code.
    pub fn from_document(document: &Document, styles: &StyleConfig) -> Result<Self, TreeShapeError> {
        let mut nodes = Vec::with_capacity(document.body.content.len());

        for element in &document.body.content {
            if let Some(paragraph) = &element.paragraph {
                nodes.push(Node::Paragraph(ParagraphNode {
                    style: paragraph.paragraph_style.named_style_type,
                    list: paragraph.bullet.as_ref().map(|b| document.list_kind(b)),
                    runs: runs(paragraph, styles),
                }));
            } else if let Some(table) = &element.table {
                nodes.push(Node::Table(table_node(table, styles)?));
            }
        }

        Ok(Self { nodes })
    }
}

fn runs(paragraph: &document::Paragraph, styles: &StyleConfig) -> Vec<Run> {
    paragraph
        .elements
        .iter()
        .filter_map(|e| e.text_run.as_ref())
        .map(|run| Run {
            text: run.content.clone(),
            bold: run.text_style.is_bold(),
            italic: run.text_style.is_italic(),
            code: run.text_style.font_family() == Some(styles.code_font.as_str()),
        })
        .collect()
}

fn table_node(table: &document::Table, styles: &StyleConfig) -> Result<TableNode, TreeShapeError> {
    let expected = table
        .table_rows
        .first()
        .map(|r| r.table_cells.len())
        .ok_or(TreeShapeError::EmptyTable)?;

    let mut rows = Vec::with_capacity(table.table_rows.len());
    for (row, table_row) in table.table_rows.iter().enumerate() {
        if table_row.table_cells.len() != expected {
            return Err(TreeShapeError::RaggedRow {
                row,
                expected,
                found: table_row.table_cells.len(),
            });
        }

        let mut cells = Vec::with_capacity(expected);
        for (column, cell) in table_row.table_cells.iter().enumerate() {
            cells.push(cell_runs(&cell.content, styles).ok_or(TreeShapeError::EmptyCell { row, column })?);
        }
        rows.push(cells);
    }

    Ok(TableNode { rows })
}

/// Runs of every paragraph in a cell, line breaks stripped. `None` when the
/// cell holds no paragraph at all.
fn cell_runs(content: &[StructuralElement], styles: &StyleConfig) -> Option<Vec<Run>> {
    let mut paragraphs = content.iter().filter_map(|e| e.paragraph.as_ref()).peekable();
    paragraphs.peek()?;

    let cell = paragraphs
        .flat_map(|p| runs(p, styles))
        .filter_map(|mut run| {
            run.text = run.text.trim_end_matches('\n').to_string();
            (!run.text.is_empty()).then_some(run)
        })
        .collect();
    Some(cell)
}
