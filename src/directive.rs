//! Edit directives and their wire shape.
//!
//! A directive is a plain value addressed against the document's offset
//! space at the moment it was produced. Serialized, each one is a single
//! request object of a batch update, e.g. `{"insertText": {...}}`.

use serde::{Deserialize, Serialize};

use crate::block::{Alignment, NamedStyle};
use crate::error::OrderingError;
use crate::offset::{TextRange, doc_len};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    #[serde(rename = "insertText")]
    InsertText(InsertText),
    #[serde(rename = "updateParagraphStyle")]
    SetParagraphStyle(SetParagraphStyle),
    #[serde(rename = "updateTextStyle")]
    SetTextStyle(SetTextStyle),
    #[serde(rename = "createParagraphBullets")]
    CreateListMarkers(CreateListMarkers),
    #[serde(rename = "insertTable")]
    InsertTable(InsertTable),
    #[serde(rename = "updateTableCellStyle")]
    SetCellAlignment(SetCellAlignment),
    #[serde(rename = "deleteContentRange")]
    DeleteContentRange(DeleteContentRange),
    #[serde(rename = "replaceAllText")]
    ReplaceAllText(ReplaceAllText),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertText {
    pub location: Location,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetParagraphStyle {
    pub range: TextRange,
    pub paragraph_style: ParagraphStyleUpdate,
    pub fields: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyleUpdate {
    pub named_style_type: NamedStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTextStyle {
    pub range: TextRange,
    pub text_style: TextStyle,
    pub fields: String,
}

/// Character styling, shared by `updateTextStyle` requests and the
/// `textStyle` of runs read back from a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_font_family: Option<WeightedFontFamily>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<Dimension>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedFontFamily {
    pub font_family: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub magnitude: f64,
    pub unit: String,
}

impl TextStyle {
    pub fn bold() -> Self {
        Self {
            bold: Some(true),
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: Some(true),
            ..Self::default()
        }
    }

    pub fn monospace(font_family: &str, size_pt: f64) -> Self {
        Self {
            weighted_font_family: Some(WeightedFontFamily {
                font_family: font_family.to_string(),
            }),
            font_size: Some(Dimension {
                magnitude: size_pt,
                unit: "PT".to_string(),
            }),
            ..Self::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.bold.unwrap_or(false)
    }

    pub fn is_italic(&self) -> bool {
        self.italic.unwrap_or(false)
    }

    pub fn font_family(&self) -> Option<&str> {
        self.weighted_font_family.as_ref().map(|f| f.font_family.as_str())
    }

    /// The `fields` mask naming every field this style sets.
    pub fn fields(&self) -> String {
        let mut fields = Vec::new();
        if self.bold.is_some() {
            fields.push("bold");
        }
        if self.italic.is_some() {
            fields.push("italic");
        }
        if self.weighted_font_family.is_some() {
            fields.push("weightedFontFamily");
        }
        if self.font_size.is_some() {
            fields.push("fontSize");
        }
        fields.join(",")
    }

    /// Overlay the fields set in `update`.
    pub fn merge(&mut self, update: &TextStyle) {
        if update.bold.is_some() {
            self.bold = update.bold;
        }
        if update.italic.is_some() {
            self.italic = update.italic;
        }
        if update.weighted_font_family.is_some() {
            self.weighted_font_family = update.weighted_font_family.clone();
        }
        if update.font_size.is_some() {
            self.font_size = update.font_size.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListMarkers {
    pub range: TextRange,
    pub bullet_preset: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertTable {
    pub rows: usize,
    pub columns: usize,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCellAlignment {
    pub table_range: TableRange,
    pub table_cell_style: TableCellStyle,
    pub fields: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRange {
    pub table_cell_location: TableCellLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCellLocation {
    pub table_start_location: Location,
    pub row_index: usize,
    pub column_index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCellStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_alignment: Option<ContentAlignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentAlignment {
    Start,
    Center,
    End,
}

impl From<Alignment> for ContentAlignment {
    fn from(alignment: Alignment) -> Self {
        match alignment {
            Alignment::Left => ContentAlignment::Start,
            Alignment::Center => ContentAlignment::Center,
            Alignment::Right => ContentAlignment::End,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteContentRange {
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceAllText {
    pub contains_text: SubstringMatch,
    pub replace_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstringMatch {
    pub text: String,
    pub match_case: bool,
}

impl Directive {
    pub fn insert_text(index: usize, text: impl Into<String>) -> Self {
        Directive::InsertText(InsertText {
            location: Location { index },
            text: text.into(),
        })
    }

    pub fn paragraph_style(range: TextRange, style: NamedStyle) -> Self {
        Directive::SetParagraphStyle(SetParagraphStyle {
            range,
            paragraph_style: ParagraphStyleUpdate {
                named_style_type: style,
            },
            fields: "namedStyleType".to_string(),
        })
    }

    pub fn text_style(range: TextRange, style: TextStyle) -> Self {
        let fields = style.fields();
        Directive::SetTextStyle(SetTextStyle {
            range,
            text_style: style,
            fields,
        })
    }

    pub fn list_markers(range: TextRange, preset: impl Into<String>) -> Self {
        Directive::CreateListMarkers(CreateListMarkers {
            range,
            bullet_preset: preset.into(),
        })
    }

    pub fn insert_table(index: usize, rows: usize, columns: usize) -> Self {
        Directive::InsertTable(InsertTable {
            rows,
            columns,
            location: Location { index },
        })
    }

    pub fn cell_alignment(table_start: usize, row: usize, column: usize, alignment: Alignment) -> Self {
        Directive::SetCellAlignment(SetCellAlignment {
            table_range: TableRange {
                table_cell_location: TableCellLocation {
                    table_start_location: Location { index: table_start },
                    row_index: row,
                    column_index: column,
                },
            },
            table_cell_style: TableCellStyle {
                content_alignment: Some(alignment.into()),
            },
            fields: "contentAlignment".to_string(),
        })
    }

    pub fn delete_range(range: TextRange) -> Self {
        Directive::DeleteContentRange(DeleteContentRange { range })
    }

    pub fn replace_all(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Directive::ReplaceAllText(ReplaceAllText {
            contains_text: SubstringMatch {
                text: find.into(),
                match_case: true,
            },
            replace_text: replace.into(),
        })
    }

    /// The text range this directive addresses, if it addresses one.
    pub fn range(&self) -> Option<TextRange> {
        match self {
            Directive::SetParagraphStyle(d) => Some(d.range),
            Directive::SetTextStyle(d) => Some(d.range),
            Directive::CreateListMarkers(d) => Some(d.range),
            Directive::DeleteContentRange(d) => Some(d.range),
            _ => None,
        }
    }
}

/// Reply to one batch update, one entry per directive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_all_text: Option<ReplaceAllTextReply>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceAllTextReply {
    #[serde(default)]
    pub occurrences_changed: usize,
}

impl BatchResponse {
    pub fn occurrences_changed(&self) -> usize {
        self.replies
            .iter()
            .filter_map(|r| r.replace_all_text)
            .map(|r| r.occurrences_changed)
            .sum()
    }
}

/// Ordered list of directives for one batch.
///
/// The service applies requests in order, and a paragraph style applied after
/// a text style on the same range resets it. The builder therefore refuses a
/// paragraph style whose range touches a text style that is already in the
/// batch. Ranges already recorded are shifted by later insertions and
/// deletions so the check stays in the batch's current offset space.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    directives: Vec<Directive>,
    text_styled: Vec<TextRange>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, directive: Directive) -> Result<&mut Self, OrderingError> {
        match &directive {
            Directive::SetParagraphStyle(d) => {
                let paragraph = d.range;
                let probe = if paragraph.is_empty() {
                    TextRange::new(paragraph.start, paragraph.start + 1)
                } else {
                    paragraph
                };
                if let Some(styled) = self.text_styled.iter().find(|r| r.overlaps(&probe)) {
                    return Err(OrderingError {
                        paragraph,
                        text: *styled,
                    });
                }
            }
            Directive::SetTextStyle(d) => self.text_styled.push(d.range),
            Directive::InsertText(d) => {
                let at = d.location.index;
                let len = doc_len(&d.text);
                for range in &mut self.text_styled {
                    if range.start >= at {
                        range.start += len;
                        range.end += len;
                    } else if range.end > at {
                        range.end += len;
                    }
                }
            }
            Directive::DeleteContentRange(d) => {
                let removed = d.range;
                self.text_styled.retain(|r| !r.overlaps(&removed));
                for range in &mut self.text_styled {
                    if range.start >= removed.end {
                        range.start -= removed.len();
                        range.end -= removed.len();
                    }
                }
            }
            _ => {}
        }
        self.directives.push(directive);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn finish(self) -> Vec<Directive> {
        self.directives
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shapes() {
        let range = TextRange::new(1, 6);
        assert_eq!(
            serde_json::to_value(Directive::insert_text(1, "hello")).unwrap(),
            json!({"insertText": {"location": {"index": 1}, "text": "hello"}})
        );
        assert_eq!(
            serde_json::to_value(Directive::paragraph_style(range, NamedStyle::Heading2)).unwrap(),
            json!({"updateParagraphStyle": {
                "range": {"startIndex": 1, "endIndex": 6},
                "paragraphStyle": {"namedStyleType": "HEADING_2"},
                "fields": "namedStyleType"
            }})
        );
        assert_eq!(
            serde_json::to_value(Directive::text_style(range, TextStyle::bold())).unwrap(),
            json!({"updateTextStyle": {
                "range": {"startIndex": 1, "endIndex": 6},
                "textStyle": {"bold": true},
                "fields": "bold"
            }})
        );
        assert_eq!(
            serde_json::to_value(Directive::list_markers(range, "BULLET_DISC_CIRCLE_SQUARE")).unwrap(),
            json!({"createParagraphBullets": {
                "range": {"startIndex": 1, "endIndex": 6},
                "bulletPreset": "BULLET_DISC_CIRCLE_SQUARE"
            }})
        );
        assert_eq!(
            serde_json::to_value(Directive::insert_table(10, 2, 3)).unwrap(),
            json!({"insertTable": {"rows": 2, "columns": 3, "location": {"index": 10}}})
        );
        assert_eq!(
            serde_json::to_value(Directive::cell_alignment(11, 0, 1, Alignment::Right)).unwrap(),
            json!({"updateTableCellStyle": {
                "tableRange": {"tableCellLocation": {
                    "tableStartLocation": {"index": 11},
                    "rowIndex": 0,
                    "columnIndex": 1
                }},
                "tableCellStyle": {"contentAlignment": "END"},
                "fields": "contentAlignment"
            }})
        );
    }

    #[test]
    fn monospace_fields() {
        let style = TextStyle::monospace("Courier New", 10.0);
        assert_eq!(style.fields(), "weightedFontFamily,fontSize");
        assert_eq!(
            serde_json::to_value(&style).unwrap(),
            json!({
                "weightedFontFamily": {"fontFamily": "Courier New"},
                "fontSize": {"magnitude": 10.0, "unit": "PT"}
            })
        );
    }

    #[test]
    fn directives_deserialize_from_wire() {
        let value = json!({"deleteContentRange": {"range": {"startIndex": 4, "endIndex": 9}}});
        let directive: Directive = serde_json::from_value(value).unwrap();
        assert_eq!(directive, Directive::delete_range(TextRange::new(4, 9)));
    }

    #[test]
    fn builder_accepts_paragraph_then_text_style() {
        let mut batch = BatchBuilder::new();
        batch
            .push(Directive::paragraph_style(TextRange::new(1, 10), NamedStyle::NormalText))
            .unwrap()
            .push(Directive::text_style(TextRange::new(2, 4), TextStyle::bold()))
            .unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn builder_refuses_paragraph_style_after_text_style() {
        let mut batch = BatchBuilder::new();
        batch
            .push(Directive::text_style(TextRange::new(2, 4), TextStyle::bold()))
            .unwrap();
        let err = batch
            .push(Directive::paragraph_style(TextRange::new(1, 10), NamedStyle::NormalText))
            .unwrap_err();
        assert_eq!(err.text, TextRange::new(2, 4));
        // A later, disjoint line is fine.
        assert!(
            batch
                .push(Directive::paragraph_style(TextRange::new(11, 15), NamedStyle::NormalText))
                .is_ok()
        );
    }

    #[test]
    fn builder_tracks_insertions() {
        let mut batch = BatchBuilder::new();
        batch
            .push(Directive::text_style(TextRange::new(5, 7), TextStyle::italic()))
            .unwrap()
            .push(Directive::insert_text(1, "abc"))
            .unwrap();
        // The styled text now sits at 8..10.
        assert!(
            batch
                .push(Directive::paragraph_style(TextRange::new(5, 8), NamedStyle::NormalText))
                .is_ok()
        );
        assert!(
            batch
                .push(Directive::paragraph_style(TextRange::new(9, 12), NamedStyle::NormalText))
                .is_err()
        );
    }

    #[test]
    fn occurrences_sum_over_replies() {
        let response: BatchResponse = serde_json::from_value(json!({
            "replies": [{"replaceAllText": {"occurrencesChanged": 3}}, {}]
        }))
        .unwrap();
        assert_eq!(response.occurrences_changed(), 3);
    }
}
