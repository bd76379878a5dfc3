//! Table population.
//!
//! Cell positions only exist once the table skeleton has been committed, so
//! a table moves through three states:
//!
//! - [`PlannedTable`]: parsed, not yet in the document. Produces the
//!   structural `insertTable` directive.
//! - [`CommittedTable`]: the skeleton was committed. Given a re-fetched
//!   document it produces the batch that fills every cell.
//! - [`PopulatedTable`]: the population batch was committed.
//!
//! Each transition consumes the previous state, so a table cannot be
//! populated before its structure exists or populated twice.

use tracing::debug;

use crate::block::TableSpec;
use crate::config::StyleConfig;
use crate::directive::Directive;
use crate::document::Document;
use crate::error::AddressError;
use crate::inline;
use crate::offset::doc_len;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTable {
    spec: TableSpec,
}

impl PlannedTable {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    /// The `insertTable` directive, to be committed alone.
    pub fn structure_directive(&self) -> Directive {
        Directive::insert_table(
            self.spec.insertion_index,
            self.spec.row_count(),
            self.spec.column_count(),
        )
    }

    pub fn into_spec(self) -> TableSpec {
        self.spec
    }

    /// Record that the structure directive was committed.
    pub fn structure_committed(self) -> CommittedTable {
        CommittedTable { spec: self.spec }
    }
}

/// A table whose skeleton exists in the document but whose cells are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTable {
    spec: TableSpec,
}

impl CommittedTable {
    pub fn insertion_index(&self) -> usize {
        self.spec.insertion_index
    }

    /// Where the table element starts once inserted. The service puts a line
    /// break in front of a new table, which moves it one past the insertion
    /// index.
    pub fn expected_start(&self) -> usize {
        self.spec.insertion_index + 1
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    /// Build the batch that fills every cell, against a document fetched
    /// after the structural commit.
    ///
    /// Cells are visited row-major, header row first. Each cell's insert
    /// location is its fetched content start shifted by the text inserted
    /// into earlier cells of the same batch.
    pub fn population_batch(
        &self,
        document: &Document,
        styles: &StyleConfig,
    ) -> Result<Vec<Directive>, AddressError> {
        let start = self.expected_start();
        let table = document
            .table_at(start)
            .ok_or(AddressError::TableNotFound { start_index: start })?;

        let mut directives = Vec::new();
        let mut shift = 0;

        for (row, column, text) in self.spec.cells() {
            let anchor = table.cell_content_start(row, column)? + shift;
            let parsed = inline::parse_line(text);

            if !parsed.plain.is_empty() {
                directives.push(Directive::insert_text(anchor, parsed.plain.clone()));
                for (range, style) in parsed.text_styles(anchor, styles) {
                    directives.push(Directive::text_style(range, style));
                }
            }
            let alignment = self.spec.alignments.get(column).copied().unwrap_or_default();
            directives.push(Directive::cell_alignment(start, row, column, alignment));

            shift += doc_len(&parsed.plain);
        }

        debug!(
            table_start = start,
            requests = directives.len(),
            "Prepared table population"
        );
        Ok(directives)
    }

    /// Record that the population batch was committed.
    pub fn populated(self) -> PopulatedTable {
        PopulatedTable { spec: self.spec }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulatedTable {
    spec: TableSpec,
}

impl PopulatedTable {
    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }
}
