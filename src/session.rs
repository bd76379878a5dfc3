//! Read and write flows against a document service.
//!
//! Every round-trip is awaited in order. A write commits its text batch
//! first, then each table's structure and population as separate batches,
//! because cell positions only exist once the structure is committed.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::block::{NamedStyle, TableSpec};
use crate::compiler::Compiler;
use crate::config::Config;
use crate::decompiler;
use crate::directive::{BatchResponse, Directive};
use crate::document::Document;
use crate::error::{CommitPhase, ServiceError, SessionError};
use crate::offset::doc_len;
use crate::paginate::{Page, paginate};
use crate::population::{CommittedTable, PlannedTable, PopulatedTable};
use crate::tree::DocumentTree;

/// The remote document service: fetch a document, apply a batch.
#[allow(async_fn_in_trait)]
pub trait DocumentService {
    async fn get_document(&mut self, document_id: &str) -> Result<Document, ServiceError>;

    async fn batch_update(
        &mut self,
        document_id: &str,
        directives: &[Directive],
    ) -> Result<BatchResponse, ServiceError>;
}

/// Where a write lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Position {
    Start,
    #[default]
    End,
    Index(usize),
}

impl Position {
    /// Resolve against the document's end index. `End` is just before the
    /// body's final line break.
    pub fn resolve(self, end_index: usize) -> usize {
        match self {
            Position::Start => 1,
            Position::End => end_index.saturating_sub(1).max(1),
            Position::Index(index) => index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_text: Option<String>,
    /// In document units.
    pub inserted_characters: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub tables: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatSummary {
    pub formatted_text: String,
    pub style: NamedStyle,
    pub start_index: usize,
    pub end_index: usize,
}

pub struct Session<S> {
    service: S,
    config: Config,
}

impl<S: DocumentService> Session<S> {
    pub fn new(service: S, config: Config) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    pub fn into_service(self) -> S {
        self.service
    }

    async fn fetch(
        &mut self,
        document_id: &str,
        after_structure: bool,
    ) -> Result<Document, SessionError> {
        self.service
            .get_document(document_id)
            .await
            .map_err(|source| SessionError::Fetch {
                after_structure,
                source,
            })
    }

    async fn commit(
        &mut self,
        document_id: &str,
        phase: CommitPhase,
        batch: Vec<Directive>,
    ) -> Result<BatchResponse, SessionError> {
        debug!(%phase, requests = batch.len(), "Committing batch");
        match self.service.batch_update(document_id, &batch).await {
            Ok(response) => Ok(response),
            Err(source) => {
                warn!(%phase, error = %source, "Batch rejected");
                Err(SessionError::RemoteCommit {
                    phase,
                    batch,
                    source,
                })
            }
        }
    }

    /// Read the document's plain text, paginated by lines.
    #[instrument(skip(self))]
    pub async fn read_text(
        &mut self,
        document_id: &str,
        start_line: usize,
        max_lines: Option<usize>,
    ) -> Result<Page, SessionError> {
        let document = self.fetch(document_id, false).await?;
        let max_lines = max_lines.unwrap_or(self.config.read.max_lines);
        Ok(paginate(
            &document.plain_text(),
            &document.title,
            start_line,
            max_lines,
        ))
    }

    /// Read the document as markup, paginated by lines.
    #[instrument(skip(self))]
    pub async fn read_markdown(
        &mut self,
        document_id: &str,
        start_line: usize,
        max_lines: Option<usize>,
    ) -> Result<Page, SessionError> {
        let document = self.fetch(document_id, false).await?;
        let tree = DocumentTree::from_document(&document, &self.config.styles)?;
        let markdown = decompiler::decompile(&tree);
        let max_lines = max_lines.unwrap_or(self.config.read.max_lines);
        Ok(paginate(&markdown, &document.title, start_line, max_lines))
    }

    /// Insert unformatted text.
    #[instrument(skip(self, text))]
    pub async fn write_text(
        &mut self,
        document_id: &str,
        text: &str,
        position: Position,
    ) -> Result<WriteSummary, SessionError> {
        let document = self.fetch(document_id, false).await?;
        let index = position.resolve(document.end_index());

        if !text.is_empty() {
            self.commit(
                document_id,
                CommitPhase::Text,
                vec![Directive::insert_text(index, text)],
            )
            .await?;
        }

        let inserted = doc_len(text);
        Ok(WriteSummary {
            replaced_text: None,
            inserted_characters: inserted,
            start_index: index,
            end_index: index + inserted,
            tables: 0,
        })
    }

    /// Replace every occurrence of `old_text`. Returns the number replaced.
    #[instrument(skip(self))]
    pub async fn replace_text(
        &mut self,
        document_id: &str,
        old_text: &str,
        new_text: &str,
    ) -> Result<usize, SessionError> {
        let response = self
            .commit(
                document_id,
                CommitPhase::Replace,
                vec![Directive::replace_all(old_text, new_text)],
            )
            .await?;
        Ok(response.occurrences_changed())
    }

    /// Compile markup and write it, tables included.
    ///
    /// The markup is compiled before anything is sent, so a malformed table
    /// leaves the document untouched.
    #[instrument(skip(self, markdown))]
    pub async fn write_markdown(
        &mut self,
        document_id: &str,
        markdown: &str,
        position: Position,
    ) -> Result<WriteSummary, SessionError> {
        let document = self.fetch(document_id, false).await?;
        let index = position.resolve(document.end_index());
        let compiled = Compiler::new(&self.config.styles).compile(markdown, index)?;

        let batch = compiled.text_batch();
        if !batch.is_empty() {
            self.commit(document_id, CommitPhase::Text, batch).await?;
        }
        let tables = self.write_tables(document_id, compiled.tables).await?;

        let inserted = doc_len(&compiled.plain_text);
        info!(start = index, inserted, tables, "Wrote markup");
        Ok(WriteSummary {
            replaced_text: None,
            inserted_characters: inserted,
            start_index: index,
            end_index: index + inserted,
            tables,
        })
    }

    /// Replace the first occurrence of `old_text` with compiled markup.
    ///
    /// The deletion, insertion and styling go in one batch; tables follow.
    /// When `old_text` does not end a line, the final line break of the
    /// compiled text is dropped so the surrounding paragraph stays joined.
    #[instrument(skip(self, markdown))]
    pub async fn replace_with_markdown(
        &mut self,
        document_id: &str,
        old_text: &str,
        markdown: &str,
    ) -> Result<WriteSummary, SessionError> {
        let document = self.fetch(document_id, false).await?;
        let range = document
            .find_text(old_text)
            .ok_or_else(|| SessionError::TextNotFound(old_text.to_string()))?;

        let compiled = Compiler::new(&self.config.styles).compile(markdown, range.start)?;
        let mut text = compiled.plain_text.as_str();
        if !old_text.ends_with('\n') {
            text = text.strip_suffix('\n').unwrap_or(text);
        }

        let mut batch = vec![Directive::delete_range(range)];
        if !text.is_empty() {
            batch.push(Directive::insert_text(range.start, text));
        }
        batch.extend(compiled.directives);
        self.commit(document_id, CommitPhase::Text, batch).await?;

        let inserted = doc_len(text);
        let tables = self.write_tables(document_id, compiled.tables).await?;
        Ok(WriteSummary {
            replaced_text: Some(old_text.to_string()),
            inserted_characters: inserted,
            start_index: range.start,
            end_index: range.start + inserted,
            tables,
        })
    }

    /// Apply a named paragraph style to the paragraphs holding the first
    /// occurrence of `text`.
    #[instrument(skip(self))]
    pub async fn format_text(
        &mut self,
        document_id: &str,
        text: &str,
        style: NamedStyle,
    ) -> Result<FormatSummary, SessionError> {
        let document = self.fetch(document_id, false).await?;
        let range = document
            .find_text(text)
            .ok_or_else(|| SessionError::TextNotFound(text.to_string()))?;

        self.commit(
            document_id,
            CommitPhase::Format,
            vec![Directive::paragraph_style(range, style)],
        )
        .await?;

        Ok(FormatSummary {
            formatted_text: text.to_string(),
            style,
            start_index: range.start,
            end_index: range.end,
        })
    }

    /// Insert and populate tables, last one first so earlier insertion
    /// indices stay valid. Returns the number written.
    ///
    /// Any failure comes back as [`SessionError::TablesIncomplete`], holding
    /// the tables that were not written.
    pub async fn write_tables(
        &mut self,
        document_id: &str,
        mut tables: Vec<TableSpec>,
    ) -> Result<usize, SessionError> {
        tables.sort_by(|a, b| b.insertion_index.cmp(&a.insertion_index));
        let mut remaining = tables.into_iter();
        let mut written = 0;

        while let Some(spec) = remaining.next() {
            let planned = PlannedTable::new(spec);
            let structure = vec![planned.structure_directive()];
            if let Err(source) = self
                .commit(document_id, CommitPhase::TableStructure, structure)
                .await
            {
                let mut pending = vec![planned.into_spec()];
                pending.extend(remaining);
                return Err(incomplete(written, None, pending, source));
            }

            let committed = planned.structure_committed();
            if let Err(source) = self.populate_table(document_id, committed.clone()).await {
                return Err(incomplete(
                    written,
                    Some(committed),
                    remaining.collect(),
                    source,
                ));
            }
            written += 1;
        }

        Ok(written)
    }

    /// Fill a table whose structure is already committed.
    ///
    /// Also the way to retry after [`SessionError::AddressResolution`],
    /// which hands the committed table back.
    pub async fn populate_table(
        &mut self,
        document_id: &str,
        table: CommittedTable,
    ) -> Result<PopulatedTable, SessionError> {
        let document = self.fetch(document_id, true).await?;

        let batch = match table.population_batch(&document, &self.config.styles) {
            Ok(batch) => batch,
            Err(source) => {
                warn!(
                    insertion_index = table.insertion_index(),
                    error = %source,
                    "Table structure committed but population failed"
                );
                return Err(SessionError::AddressResolution {
                    table: Box::new(table),
                    source,
                });
            }
        };

        self.commit(document_id, CommitPhase::TablePopulation, batch)
            .await?;
        debug!(
            insertion_index = table.insertion_index(),
            "Populated table"
        );
        Ok(table.populated())
    }
}

fn incomplete(
    written: usize,
    unpopulated: Option<CommittedTable>,
    pending: Vec<TableSpec>,
    source: SessionError,
) -> SessionError {
    warn!(written, pending = pending.len(), "Tables left unwritten");
    SessionError::TablesIncomplete {
        written,
        unpopulated: unpopulated.map(Box::new),
        pending,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Alignment;
    use crate::directive::ContentAlignment;
    use crate::error::{AddressError, CompileError};
    use crate::memory::MemoryDocument;

    const DOC: &str = "doc";

    /// Wraps a memory document, recording batches and injecting faults.
    struct Scripted {
        inner: MemoryDocument,
        batches: Vec<Vec<Directive>>,
        fail_batch: Option<usize>,
        /// Fail fetches once this many batches have been sent.
        fail_fetch_after: Option<usize>,
        hide_tables: bool,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                inner: MemoryDocument::new(DOC, "Test"),
                batches: Vec::new(),
                fail_batch: None,
                fail_fetch_after: None,
                hide_tables: false,
            }
        }
    }

    impl DocumentService for Scripted {
        async fn get_document(&mut self, document_id: &str) -> Result<Document, ServiceError> {
            if self.fail_fetch_after == Some(self.batches.len()) {
                return Err(ServiceError::new("read timed out"));
            }
            let mut document = self.inner.get_document(document_id).await?;
            if self.hide_tables {
                document.body.content.retain(|e| e.table.is_none());
            }
            Ok(document)
        }

        async fn batch_update(
            &mut self,
            document_id: &str,
            directives: &[Directive],
        ) -> Result<BatchResponse, ServiceError> {
            let n = self.batches.len();
            self.batches.push(directives.to_vec());
            if self.fail_batch == Some(n) {
                return Err(ServiceError::new("backend unavailable"));
            }
            self.inner.batch_update(document_id, directives).await
        }
    }

    fn session() -> Session<Scripted> {
        Session::new(Scripted::new(), Config::default())
    }

    async fn markdown(session: &mut Session<Scripted>) -> String {
        session.read_markdown(DOC, 1, None).await.unwrap().content
    }

    #[test]
    fn positions() {
        assert_eq!(Position::Start.resolve(40), 1);
        assert_eq!(Position::End.resolve(40), 39);
        assert_eq!(Position::End.resolve(1), 1);
        assert_eq!(Position::Index(7).resolve(40), 7);
    }

    #[tokio::test]
    async fn markup_round_trips() {
        let mut session = session();
        let source = "# Title\nSome **bold** and *it*\n- a\n1. b";
        let summary = session
            .write_markdown(DOC, source, Position::End)
            .await
            .unwrap();
        assert_eq!(summary.start_index, 1);
        assert_eq!(summary.tables, 0);
        assert_eq!(markdown(&mut session).await, source);
    }

    #[tokio::test]
    async fn table_is_written_in_three_batches() {
        let mut session = session();
        let source = "Intro\n| a | b |\n|:-:|---|\n| 1 | **2** |\nOutro";
        let summary = session
            .write_markdown(DOC, source, Position::End)
            .await
            .unwrap();
        assert_eq!(summary.tables, 1);

        let batches = &session.service().batches;
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1], vec![Directive::insert_table(7, 2, 2)]);

        assert_eq!(
            markdown(&mut session).await,
            "Intro\n| a | b     |\n|---|-----|\n| 1 | **2** |\n\nOutro"
        );

        let document = session.service().inner.document();
        let table = document.table_at(8).unwrap();
        let alignments: Vec<Option<ContentAlignment>> = table.table_rows[1]
            .table_cells
            .iter()
            .map(|c| c.table_cell_style.content_alignment)
            .collect();
        assert_eq!(
            alignments,
            vec![Some(ContentAlignment::Center), Some(ContentAlignment::Start)]
        );
    }

    #[tokio::test]
    async fn several_tables_keep_their_places() {
        let mut session = session();
        let source = "| x |\n|---|\n| 1 |\nmiddle\n| y |\n|---|\n| 2 |";
        session
            .write_markdown(DOC, source, Position::End)
            .await
            .unwrap();

        let batches = &session.service().batches;
        // Later table first.
        assert_eq!(batches[1], vec![Directive::insert_table(9, 2, 1)]);
        assert_eq!(batches[3], vec![Directive::insert_table(1, 2, 1)]);

        assert_eq!(
            markdown(&mut session).await,
            "| x |\n|---|\n| 1 |\n\nmiddle\n| y |\n|---|\n| 2 |\n"
        );
    }

    #[tokio::test]
    async fn malformed_table_sends_nothing() {
        let mut session = session();
        let err = session
            .write_markdown(DOC, "ok\n| a | b |\n|---|---|\n| 1 |", Position::End)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Compile(CompileError::StructuralParse { line: 4, .. })
        ));
        assert!(!err.is_partial());
        assert!(session.service().batches.is_empty());
    }

    #[tokio::test]
    async fn missing_table_is_partial_and_retryable() {
        let mut session = session();
        session.service_mut().hide_tables = true;

        let err = session
            .write_markdown(DOC, "| h |\n|---|\n| v |", Position::End)
            .await
            .unwrap_err();
        assert!(err.is_partial());
        let SessionError::TablesIncomplete {
            written: 0,
            unpopulated: Some(table),
            pending,
            source,
        } = err
        else {
            panic!("expected incomplete tables");
        };
        assert!(pending.is_empty());
        assert!(source.is_partial());
        assert!(matches!(
            *source,
            SessionError::AddressResolution {
                source: AddressError::TableNotFound { start_index: 2 },
                ..
            }
        ));
        // Structure only: text batch and insertTable.
        assert_eq!(session.service().batches.len(), 2);

        session.service_mut().hide_tables = false;
        let populated = session.populate_table(DOC, *table).await.unwrap();
        assert_eq!(populated.spec().alignments, vec![Alignment::Left]);
        assert_eq!(markdown(&mut session).await, "| h |\n|---|\n| v |\n");
    }

    #[tokio::test]
    async fn rejected_population_carries_its_batch() {
        let mut session = session();
        session.service_mut().fail_batch = Some(2);

        let err = session
            .write_markdown(DOC, "| h |\n|---|\n| v |", Position::End)
            .await
            .unwrap_err();
        assert!(err.is_partial());
        let SessionError::TablesIncomplete { source, .. } = err else {
            panic!("expected incomplete tables");
        };
        let SessionError::RemoteCommit { phase, batch, .. } = *source else {
            panic!("expected remote commit error");
        };
        assert_eq!(phase, CommitPhase::TablePopulation);
        assert!(batch.contains(&Directive::cell_alignment(2, 1, 0, Alignment::Left)));
    }

    #[tokio::test]
    async fn failed_fetch_after_structure_is_partial() {
        let mut session = session();
        // Text batch and insertTable go through, the re-read fails.
        session.service_mut().fail_fetch_after = Some(2);

        let err = session
            .write_markdown(DOC, "| h |\n|---|\n| v |", Position::End)
            .await
            .unwrap_err();
        assert!(err.is_partial());
        let SessionError::TablesIncomplete {
            unpopulated: Some(table),
            source,
            ..
        } = err
        else {
            panic!("expected incomplete tables");
        };
        assert!(matches!(
            *source,
            SessionError::Fetch {
                after_structure: true,
                ..
            }
        ));
        assert!(source.is_partial());

        session.service_mut().fail_fetch_after = None;
        session.populate_table(DOC, *table).await.unwrap();
        assert_eq!(markdown(&mut session).await, "| h |\n|---|\n| v |\n");
    }

    #[tokio::test]
    async fn later_table_failure_keeps_earlier_tables() {
        let mut session = session();
        // Batches: text, structure and population of the later table, then
        // structure of the first one.
        session.service_mut().fail_batch = Some(3);

        let source = "| x |\n|---|\n| first |\nmiddle\n| y |\n|---|\n| second |";
        let err = session
            .write_markdown(DOC, source, Position::End)
            .await
            .unwrap_err();
        assert!(err.is_partial());
        let SessionError::TablesIncomplete {
            written,
            unpopulated,
            pending,
            source,
        } = err
        else {
            panic!("expected incomplete tables");
        };
        assert_eq!(written, 1);
        assert!(unpopulated.is_none());
        assert!(matches!(
            *source,
            SessionError::RemoteCommit {
                phase: CommitPhase::TableStructure,
                ..
            }
        ));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].insertion_index, 1);
        assert_eq!(pending[0].rows, vec![vec!["first".to_string()]]);

        assert_eq!(session.write_tables(DOC, pending).await.unwrap(), 1);
        assert_eq!(
            markdown(&mut session).await,
            "| x     |\n|-----|\n| first |\n\nmiddle\n| y      |\n|------|\n| second |\n"
        );
    }

    #[tokio::test]
    async fn first_structure_failure_is_not_partial() {
        let mut session = session();
        session.service_mut().fail_batch = Some(1);

        let err = session
            .write_markdown(DOC, "| h |\n|---|\n| v |", Position::End)
            .await
            .unwrap_err();
        assert!(!err.is_partial());
        let SessionError::TablesIncomplete { pending, .. } = err else {
            panic!("expected incomplete tables");
        };
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn rejected_text_batch_is_not_partial() {
        let mut session = session();
        session.service_mut().fail_batch = Some(0);
        let err = session
            .write_markdown(DOC, "# x", Position::End)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::RemoteCommit {
                phase: CommitPhase::Text,
                ..
            }
        ));
        assert!(!err.is_partial());
    }

    #[tokio::test]
    async fn plain_text_write_and_read() {
        let mut session = session();
        session
            .write_text(DOC, "one\ntwo\n", Position::Start)
            .await
            .unwrap();
        let summary = session
            .write_text(DOC, "zero\n", Position::Start)
            .await
            .unwrap();
        assert_eq!((summary.start_index, summary.end_index), (1, 6));

        let page = session.read_text(DOC, 2, Some(1)).await.unwrap();
        assert_eq!(page.content, "one");
        assert_eq!(page.title, "Test");
        assert_eq!(page.next_start_line, Some(3));
    }

    #[tokio::test]
    async fn replace_counts_occurrences() {
        let mut session = session();
        session
            .write_text(DOC, "a-b a-b\n", Position::End)
            .await
            .unwrap();
        assert_eq!(session.replace_text(DOC, "a-b", "c").await.unwrap(), 2);
        assert_eq!(session.replace_text(DOC, "zzz", "c").await.unwrap(), 0);
        let page = session.read_text(DOC, 1, None).await.unwrap();
        assert!(page.content.starts_with("c c\n"));
    }

    #[tokio::test]
    async fn replace_with_markup_inside_a_line() {
        let mut session = session();
        session
            .write_text(DOC, "Intro\nold words here\n", Position::End)
            .await
            .unwrap();
        let summary = session
            .replace_with_markdown(DOC, "old words", "**new**")
            .await
            .unwrap();
        assert_eq!(summary.replaced_text.as_deref(), Some("old words"));
        assert_eq!(summary.start_index, 7);
        assert_eq!(summary.inserted_characters, 3);
        assert_eq!(markdown(&mut session).await, "Intro\n**new** here");
    }

    #[tokio::test]
    async fn replace_with_markup_requires_the_text() {
        let mut session = session();
        let err = session
            .replace_with_markdown(DOC, "absent", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::TextNotFound(ref t) if t == "absent"));
        assert!(session.service().batches.is_empty());
    }

    #[tokio::test]
    async fn format_existing_text() {
        let mut session = session();
        session
            .write_text(DOC, "a\nTitle\n", Position::End)
            .await
            .unwrap();
        let summary = session
            .format_text(DOC, "Title", NamedStyle::Heading2)
            .await
            .unwrap();
        assert_eq!((summary.start_index, summary.end_index), (3, 8));
        assert_eq!(markdown(&mut session).await, "a\n## Title");
    }

    #[tokio::test]
    async fn fetch_failure_is_reported() {
        let mut session = Session::new(MemoryDocument::new("other", "T"), Config::default());
        let err = session.read_text(DOC, 1, None).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Fetch {
                after_structure: false,
                ..
            }
        ));
    }
}
