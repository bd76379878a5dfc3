//! An in-process document that applies directives the way the remote service
//! does.
//!
//! The body is a flat sequence of units, one per document index, starting at
//! index 1 (index 0 is the section break). Text is stored as UTF-16 code
//! units; every paragraph ends with a break unit that carries the paragraph's
//! properties. Tables are laid out as
//!
//! ```text
//! TableStart (RowStart (CellStart <paragraphs>)+)+ TableEnd
//! ```
//!
//! with each marker occupying one index. A batch is applied to a copy and
//! only kept if every directive succeeds.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::debug;

use crate::block::NamedStyle;
use crate::directive::{
    BatchResponse, ContentAlignment, CreateListMarkers, DeleteContentRange, Directive,
    InsertTable, InsertText, ReplaceAllText, ReplaceAllTextReply, Reply, SetCellAlignment,
    SetParagraphStyle, SetTextStyle, TableCellStyle, TextStyle,
};
use crate::document::{
    Body, Bullet, Document, List, ListProperties, NestingLevel, Paragraph, ParagraphElement,
    ParagraphStyle, StructuralElement, Table, TableCell, TableRow, TextRun,
};
use crate::error::ServiceError;
use crate::offset::TextRange;
use crate::session::DocumentService;

const NEWLINE: u16 = b'\n' as u16;

#[derive(Debug, Clone, Default, PartialEq)]
struct ParagraphProps {
    named_style: NamedStyle,
    list_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Unit {
    Char { code: u16, style: TextStyle },
    Break { style: TextStyle, paragraph: ParagraphProps },
    TableStart,
    RowStart,
    CellStart { alignment: Option<ContentAlignment> },
    TableEnd,
}

impl Unit {
    fn is_text(&self) -> bool {
        matches!(self, Unit::Char { .. } | Unit::Break { .. })
    }

    fn code(&self) -> Option<u16> {
        match self {
            Unit::Char { code, .. } => Some(*code),
            Unit::Break { .. } => Some(NEWLINE),
            _ => None,
        }
    }

    fn style(&self) -> Option<&TextStyle> {
        match self {
            Unit::Char { style, .. } | Unit::Break { style, .. } => Some(style),
            _ => None,
        }
    }

    fn style_mut(&mut self) -> Option<&mut TextStyle> {
        match self {
            Unit::Char { style, .. } | Unit::Break { style, .. } => Some(style),
            _ => None,
        }
    }

    fn empty_paragraph() -> Self {
        Unit::Break {
            style: TextStyle::default(),
            paragraph: ParagraphProps::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryDocument {
    document_id: String,
    title: String,
    units: Vec<Unit>,
    lists: BTreeMap<String, List>,
    next_list: usize,
}

impl MemoryDocument {
    /// A document holding one empty paragraph.
    pub fn new(document_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            title: title.into(),
            units: vec![Unit::empty_paragraph()],
            lists: BTreeMap::new(),
            next_list: 0,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Index just past the last unit of the body.
    pub fn end_index(&self) -> usize {
        self.units.len() + 1
    }

    /// Apply a batch atomically.
    pub fn apply(&mut self, directives: &[Directive]) -> Result<BatchResponse, ServiceError> {
        let mut next = self.clone();
        let mut replies = Vec::with_capacity(directives.len());

        for (i, directive) in directives.iter().enumerate() {
            let reply = next
                .apply_one(directive)
                .map_err(|e| ServiceError::new(format!("Invalid requests[{i}]: {e}")))?;
            replies.push(reply);
        }

        debug!(requests = directives.len(), end_index = next.end_index(), "Applied batch");
        *self = next;
        Ok(BatchResponse { replies })
    }

    fn apply_one(&mut self, directive: &Directive) -> Result<Reply, ServiceError> {
        match directive {
            Directive::InsertText(d) => self.insert_text(d)?,
            Directive::SetParagraphStyle(d) => self.set_paragraph_style(d)?,
            Directive::SetTextStyle(d) => self.set_text_style(d)?,
            Directive::CreateListMarkers(d) => self.create_list_markers(d)?,
            Directive::InsertTable(d) => self.insert_table(d)?,
            Directive::SetCellAlignment(d) => self.set_cell_alignment(d)?,
            Directive::DeleteContentRange(d) => self.delete_range(d)?,
            Directive::ReplaceAllText(d) => {
                let occurrences_changed = self.replace_all(d);
                return Ok(Reply {
                    replace_all_text: Some(ReplaceAllTextReply {
                        occurrences_changed,
                    }),
                });
            }
        }
        Ok(Reply::default())
    }

    /// Position in `units` of a paragraph index that text can be inserted at.
    fn insertion_pos(&self, index: usize) -> Result<usize, ServiceError> {
        let pos = index.checked_sub(1).filter(|&p| p < self.units.len());
        match pos {
            Some(pos) if self.units[pos].is_text() => Ok(pos),
            _ => Err(ServiceError::new(format!(
                "The insertion index {index} must be inside the bounds of an existing paragraph"
            ))),
        }
    }

    fn check_range(&self, range: TextRange) -> Result<(), ServiceError> {
        if range.start == 0 || range.start > range.end || range.end > self.end_index() {
            return Err(ServiceError::new(format!(
                "Invalid range {}..{} for document ending at {}",
                range.start,
                range.end,
                self.end_index()
            )));
        }
        Ok(())
    }

    /// Properties of the paragraph containing `pos`.
    fn paragraph_at(&self, pos: usize) -> ParagraphProps {
        self.units[pos..]
            .iter()
            .find_map(|u| match u {
                Unit::Break { paragraph, .. } => Some(paragraph.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn insert_text(&mut self, d: &InsertText) -> Result<(), ServiceError> {
        let pos = self.insertion_pos(d.location.index)?;
        let paragraph = self.paragraph_at(pos);
        let units = text_units(&d.text, &paragraph, &TextStyle::default());
        self.units.splice(pos..pos, units);
        Ok(())
    }

    /// Positions of the break units of every paragraph touching `range`.
    fn paragraphs_touching(&self, range: TextRange) -> Vec<usize> {
        let probe = if range.is_empty() {
            TextRange::new(range.start, range.start + 1)
        } else {
            range
        };

        let mut found = Vec::new();
        let mut paragraph_start = 0;
        for (pos, unit) in self.units.iter().enumerate() {
            match unit {
                Unit::Char { .. } => {}
                Unit::Break { .. } => {
                    if TextRange::new(paragraph_start + 1, pos + 2).overlaps(&probe) {
                        found.push(pos);
                    }
                    paragraph_start = pos + 1;
                }
                _ => paragraph_start = pos + 1,
            }
        }
        found
    }

    fn paragraph_props_mut(&mut self, pos: usize) -> Option<&mut ParagraphProps> {
        match &mut self.units[pos] {
            Unit::Break { paragraph, .. } => Some(paragraph),
            _ => None,
        }
    }

    fn set_paragraph_style(&mut self, d: &SetParagraphStyle) -> Result<(), ServiceError> {
        self.check_range(d.range)?;
        for pos in self.paragraphs_touching(d.range) {
            if let Some(props) = self.paragraph_props_mut(pos) {
                props.named_style = d.paragraph_style.named_style_type;
            }
        }
        Ok(())
    }

    fn set_text_style(&mut self, d: &SetTextStyle) -> Result<(), ServiceError> {
        self.check_range(d.range)?;
        let end = (d.range.end - 1).min(self.units.len());
        for unit in &mut self.units[d.range.start - 1..end] {
            if let Some(style) = unit.style_mut() {
                style.merge(&d.text_style);
            }
        }
        Ok(())
    }

    fn create_list_markers(&mut self, d: &CreateListMarkers) -> Result<(), ServiceError> {
        self.check_range(d.range)?;
        let list_id = format!("kix.list.{}", self.next_list);
        self.next_list += 1;

        let level = if d.bullet_preset.starts_with("NUMBERED") {
            NestingLevel {
                glyph_type: Some("DECIMAL".to_string()),
                glyph_symbol: None,
            }
        } else {
            NestingLevel {
                glyph_type: Some("GLYPH_TYPE_UNSPECIFIED".to_string()),
                glyph_symbol: Some("\u{25cf}".to_string()),
            }
        };
        self.lists.insert(
            list_id.clone(),
            List {
                list_properties: ListProperties {
                    nesting_levels: vec![level],
                },
            },
        );

        for pos in self.paragraphs_touching(d.range) {
            if let Some(props) = self.paragraph_props_mut(pos) {
                props.list_id = Some(list_id.clone());
            }
        }
        Ok(())
    }

    /// Splits the paragraph at the location with a break, then places the
    /// table right after that break.
    fn insert_table(&mut self, d: &InsertTable) -> Result<(), ServiceError> {
        if d.rows == 0 || d.columns == 0 {
            return Err(ServiceError::new("A table needs at least one row and one column"));
        }
        let pos = self.insertion_pos(d.location.index)?;
        if self.in_table(pos) {
            return Err(ServiceError::new("Nested tables are not supported"));
        }
        let paragraph = self.paragraph_at(pos);

        let mut units = Vec::with_capacity(3 + d.rows * (1 + 2 * d.columns));
        units.push(Unit::Break {
            style: TextStyle::default(),
            paragraph,
        });
        units.push(Unit::TableStart);
        for _ in 0..d.rows {
            units.push(Unit::RowStart);
            for _ in 0..d.columns {
                units.push(Unit::CellStart { alignment: None });
                units.push(Unit::empty_paragraph());
            }
        }
        units.push(Unit::TableEnd);

        self.units.splice(pos..pos, units);
        Ok(())
    }

    fn in_table(&self, pos: usize) -> bool {
        let mut depth = 0usize;
        for unit in &self.units[..pos] {
            match unit {
                Unit::TableStart => depth += 1,
                Unit::TableEnd => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        depth > 0
    }

    fn set_cell_alignment(&mut self, d: &SetCellAlignment) -> Result<(), ServiceError> {
        let location = d.table_range.table_cell_location;
        let table_pos = location
            .table_start_location
            .index
            .checked_sub(1)
            .filter(|&p| matches!(self.units.get(p), Some(Unit::TableStart)))
            .ok_or_else(|| {
                ServiceError::new(format!(
                    "No table found at index {}",
                    location.table_start_location.index
                ))
            })?;

        let cell_pos = self
            .cell_position(table_pos, location.row_index, location.column_index)
            .ok_or_else(|| {
                ServiceError::new(format!(
                    "Cell ({}, {}) is outside the table",
                    location.row_index, location.column_index
                ))
            })?;

        let TableCellStyle { content_alignment } = d.table_cell_style;
        if let Unit::CellStart { alignment } = &mut self.units[cell_pos] {
            *alignment = content_alignment;
        }
        Ok(())
    }

    fn cell_position(&self, table_pos: usize, row: usize, column: usize) -> Option<usize> {
        let mut current_row = None;
        let mut current_column = 0;

        for (pos, unit) in self.units.iter().enumerate().skip(table_pos + 1) {
            match unit {
                Unit::RowStart => {
                    current_row = Some(current_row.map_or(0, |r| r + 1));
                    current_column = 0;
                }
                Unit::CellStart { .. } => {
                    if current_row == Some(row) && current_column == column {
                        return Some(pos);
                    }
                    current_column += 1;
                }
                Unit::TableEnd => return None,
                _ => {}
            }
        }
        None
    }

    fn delete_range(&mut self, d: &DeleteContentRange) -> Result<(), ServiceError> {
        let range = d.range;
        self.check_range(range)?;
        if range.is_empty() {
            return Ok(());
        }
        let (from, to) = (range.start - 1, range.end - 1);

        if self.units[from..to].iter().any(|u| !u.is_text()) {
            return Err(ServiceError::new(
                "Invalid deletion range: cannot delete part of a table",
            ));
        }
        if to >= self.units.len() || !self.units[to].is_text() {
            return Err(ServiceError::new(
                "Invalid deletion range: cannot delete the final newline of a segment",
            ));
        }

        self.units.drain(from..to);
        Ok(())
    }

    fn replace_all(&mut self, d: &ReplaceAllText) -> usize {
        let needle: Vec<u16> = d.contains_text.text.encode_utf16().collect();
        if needle.is_empty() {
            return 0;
        }
        let fold = |code: u16| -> u16 {
            if !d.contains_text.match_case && code < 128 {
                (code as u8).to_ascii_lowercase() as u16
            } else {
                code
            }
        };

        let mut matches = Vec::new();
        let mut pos = 0;
        while pos + needle.len() <= self.units.len() {
            let hit = self.units[pos..pos + needle.len()]
                .iter()
                .zip(&needle)
                .all(|(unit, &want)| unit.code().is_some_and(|c| fold(c) == fold(want)));
            if hit {
                matches.push(pos);
                pos += needle.len();
            } else {
                pos += 1;
            }
        }

        for &at in matches.iter().rev() {
            let style = self.units[at].style().cloned().unwrap_or_default();
            let paragraph = self.paragraph_at(at + needle.len() - 1);
            let replacement = text_units(&d.replace_text, &paragraph, &style);
            self.units.splice(at..at + needle.len(), replacement);
        }

        if self.units.last().is_none_or(|u| !matches!(u, Unit::Break { .. })) {
            self.units.push(Unit::empty_paragraph());
        }
        matches.len()
    }

    /// Render the current state in the service's document shape.
    pub fn document(&self) -> Document {
        let mut content = vec![StructuralElement {
            end_index: 1,
            section_break: Some(json!({})),
            ..StructuralElement::default()
        }];

        let mut renderer = Renderer {
            units: &self.units,
            pos: 0,
        };
        while renderer.pos < self.units.len() {
            match renderer.units[renderer.pos] {
                Unit::TableStart => content.push(renderer.table()),
                Unit::Char { .. } | Unit::Break { .. } => content.push(renderer.paragraph()),
                _ => renderer.pos += 1,
            }
        }

        Document {
            document_id: Some(self.document_id.clone()),
            title: self.title.clone(),
            body: Body { content },
            lists: self.lists.clone(),
        }
    }
}

/// Units for `text`. Line breaks become paragraph breaks carrying `paragraph`.
fn text_units(text: &str, paragraph: &ParagraphProps, style: &TextStyle) -> Vec<Unit> {
    text.encode_utf16()
        .map(|code| {
            if code == NEWLINE {
                Unit::Break {
                    style: style.clone(),
                    paragraph: paragraph.clone(),
                }
            } else {
                Unit::Char {
                    code,
                    style: style.clone(),
                }
            }
        })
        .collect()
}

struct Renderer<'a> {
    units: &'a [Unit],
    pos: usize,
}

impl Renderer<'_> {
    fn index(&self) -> usize {
        self.pos + 1
    }

    /// One paragraph, up to and including its break.
    fn paragraph(&mut self) -> StructuralElement {
        let units = self.units;
        let start = self.index();
        let mut elements: Vec<ParagraphElement> = Vec::new();
        let mut codes: Vec<u16> = Vec::new();
        let mut run_style: Option<&TextStyle> = None;
        let mut run_start = start;
        let mut props = ParagraphProps::default();

        let mut flush = |codes: &mut Vec<u16>, style: Option<&TextStyle>, run_start: usize, end: usize| {
            if codes.is_empty() {
                return;
            }
            elements.push(ParagraphElement {
                start_index: Some(run_start),
                end_index: end,
                text_run: Some(TextRun {
                    content: String::from_utf16_lossy(codes),
                    text_style: style.cloned().unwrap_or_default(),
                }),
            });
            codes.clear();
        };

        while let Some(unit) = units.get(self.pos) {
            let (code, style) = match unit {
                Unit::Char { code, style } => (*code, style),
                Unit::Break { style, .. } => (NEWLINE, style),
                _ => break,
            };
            if run_style != Some(style) {
                flush(&mut codes, run_style, run_start, self.index());
                run_style = Some(style);
                run_start = self.index();
            }
            codes.push(code);
            self.pos += 1;

            if let Unit::Break { paragraph, .. } = unit {
                props = paragraph.clone();
                break;
            }
        }
        let end = self.index();
        flush(&mut codes, run_style, run_start, end);

        StructuralElement {
            start_index: Some(start),
            end_index: end,
            paragraph: Some(Paragraph {
                elements,
                paragraph_style: ParagraphStyle {
                    named_style_type: props.named_style,
                },
                bullet: props.list_id.map(|list_id| Bullet {
                    list_id,
                    nesting_level: 0,
                }),
            }),
            ..StructuralElement::default()
        }
    }

    fn table(&mut self) -> StructuralElement {
        let units = self.units;
        let start = self.index();
        self.pos += 1;

        let mut table_rows = Vec::new();
        while matches!(units.get(self.pos), Some(Unit::RowStart)) {
            let row_start = self.index();
            self.pos += 1;

            let mut table_cells = Vec::new();
            while let Some(&Unit::CellStart { alignment }) = units.get(self.pos) {
                let cell_start = self.index();
                self.pos += 1;

                let mut content = Vec::new();
                while units.get(self.pos).is_some_and(Unit::is_text) {
                    content.push(self.paragraph());
                }
                table_cells.push(TableCell {
                    start_index: Some(cell_start),
                    end_index: self.index(),
                    content,
                    table_cell_style: TableCellStyle {
                        content_alignment: alignment,
                    },
                });
            }
            table_rows.push(TableRow {
                start_index: Some(row_start),
                end_index: self.index(),
                table_cells,
            });
        }

        if matches!(units.get(self.pos), Some(Unit::TableEnd)) {
            self.pos += 1;
        }

        StructuralElement {
            start_index: Some(start),
            end_index: self.index(),
            table: Some(Table {
                rows: table_rows.len(),
                columns: table_rows.first().map_or(0, |r| r.table_cells.len()),
                table_rows,
            }),
            ..StructuralElement::default()
        }
    }
}

impl DocumentService for MemoryDocument {
    async fn get_document(&mut self, document_id: &str) -> Result<Document, ServiceError> {
        if document_id != self.document_id {
            return Err(ServiceError::new(format!(
                "Requested entity was not found: {document_id}"
            )));
        }
        Ok(self.document())
    }

    async fn batch_update(
        &mut self,
        document_id: &str,
        directives: &[Directive],
    ) -> Result<BatchResponse, ServiceError> {
        if document_id != self.document_id {
            return Err(ServiceError::new(format!(
                "Requested entity was not found: {document_id}"
            )));
        }
        self.apply(directives)
    }
}
