//! Markup → plain text + directives.
//!
//! Each block is emitted as one line of plain text followed by a line break.
//! Directives for a block are built from the block's [`Placement`] before the
//! cursor advances past it, so every range is in the offset space that exists
//! once the plain text has been inserted at the starting position.
//!
//! [`Placement`]: crate::offset::Placement

use serde::Serialize;
use tracing::debug;

use crate::block::{Block, NamedStyle, SourceBlock, TableSpec};
use crate::config::StyleConfig;
use crate::directive::{BatchBuilder, Directive};
use crate::error::CompileError;
use crate::inline::{self, InlineLine};
use crate::offset::{Cursor, doc_len};
use crate::parser;

/// Output of compiling one markup document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub plain_text: String,
    /// Style directives, to be applied after `plain_text` is inserted at `start`.
    pub directives: Vec<Directive>,
    /// Tables to insert at their placeholder lines once the text is committed.
    pub tables: Vec<TableSpec>,
    pub start: usize,
    /// Cursor after the last emitted line.
    pub end: usize,
}

impl CompileResult {
    /// The first batch of a write: insert the text, then style it.
    pub fn text_batch(&self) -> Vec<Directive> {
        if self.plain_text.is_empty() {
            return Vec::new();
        }
        std::iter::once(Directive::insert_text(self.start, self.plain_text.clone()))
            .chain(self.directives.iter().cloned())
            .collect()
    }
}

pub struct Compiler<'a> {
    styles: &'a StyleConfig,
}

impl<'a> Compiler<'a> {
    pub fn new(styles: &'a StyleConfig) -> Self {
        Self { styles }
    }

    pub fn compile(&self, markdown: &str, start: usize) -> Result<CompileResult, CompileError> {
        let blocks = parser::parse(markdown)?;
        let block_count = blocks.len();

        let mut cursor = Cursor::new(start);
        let mut plain_text = String::new();
        let mut batch = BatchBuilder::new();
        let mut tables = Vec::new();

        for SourceBlock { line, block } in blocks {
            let (emitted, styling) = match block {
                Block::Blank => (String::new(), LineStyle::Unstyled),
                Block::Table(mut spec) => {
                    spec.insertion_index = cursor.position();
                    debug!(
                        line,
                        insertion_index = spec.insertion_index,
                        rows = spec.row_count(),
                        columns = spec.column_count(),
                        "Planned table"
                    );
                    tables.push(spec);
                    (String::new(), LineStyle::Unstyled)
                }
                Block::Heading { level, text } => match NamedStyle::heading(level) {
                    Some(style) => (text, LineStyle::Paragraph(style)),
                    None => (text, LineStyle::Unstyled),
                },
                Block::BulletItem(text) => (text, LineStyle::List(&self.styles.bullet_preset)),
                Block::NumberedItem(text) => (text, LineStyle::List(&self.styles.numbered_preset)),
                Block::Paragraph(text) => {
                    let parsed = inline::parse_line(&text);
                    (parsed.plain.clone(), LineStyle::Inline(parsed))
                }
            };

            let placement = cursor.place(&emitted);
            match styling {
                LineStyle::Unstyled => {}
                LineStyle::Paragraph(style) => {
                    batch.push(Directive::paragraph_style(placement.range(), style))?;
                }
                LineStyle::List(preset) => {
                    batch.push(Directive::list_markers(placement.range(), preset))?;
                }
                LineStyle::Inline(parsed) => {
                    batch.push(Directive::paragraph_style(
                        placement.range(),
                        NamedStyle::NormalText,
                    ))?;
                    for (range, style) in parsed.text_styles(placement.start(), self.styles) {
                        batch.push(Directive::text_style(range, style))?;
                    }
                }
            }
            cursor.advance(placement);
            push_line(&mut plain_text, &emitted);
        }

        debug_assert_eq!(cursor.position(), start + doc_len(&plain_text));
        let directives = batch.finish();
        debug!(
            blocks = block_count,
            directives = directives.len(),
            tables = tables.len(),
            "Compiled markup"
        );

        Ok(CompileResult {
            plain_text,
            directives,
            tables,
            start,
            end: cursor.position(),
        })
    }
}

/// How an emitted line is styled once inserted.
enum LineStyle<'s> {
    Unstyled,
    Paragraph(NamedStyle),
    List(&'s str),
    Inline(InlineLine),
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}
