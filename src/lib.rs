mod block;
mod compiler;
mod config;
mod decompiler;
mod directive;
mod document;
mod error;
mod inline;
mod memory;
mod offset;
mod paginate;
mod parser;
mod population;
mod session;
mod table;
mod tree;

pub use block::{
    Alignment, Block, InlineSpan, ListKind, NamedStyle, SourceBlock, SpanKind, TableSpec,
};
pub use compiler::{CompileResult, Compiler};
pub use config::{Config, ReadConfig, StyleConfig};
pub use directive::{BatchBuilder, BatchResponse, ContentAlignment, Directive, TextStyle};
pub use document::Document;
pub use error::{
    AddressError, CommitPhase, CompileError, OrderingError, ServiceError, SessionError,
    TreeShapeError,
};
pub use inline::{InlineLine, parse_line as parse_inline};
pub use memory::MemoryDocument;
pub use offset::{Cursor, Placement, TextRange, doc_len};
pub use paginate::{Page, paginate};
pub use population::{CommittedTable, PlannedTable, PopulatedTable};
pub use session::{DocumentService, FormatSummary, Position, Session, WriteSummary};
pub use table::parse_table;
pub use tree::{DocumentTree, Node, ParagraphNode, Run, TableNode};

/// Parse markup into line-level blocks.
pub fn parse(markdown: &str) -> Result<Vec<SourceBlock>, CompileError> {
    parser::parse(markdown)
}

/// Compile markup for insertion at `start` with the default styles.
pub fn compile(markdown: &str, start: usize) -> Result<CompileResult, CompileError> {
    compile_with_config(markdown, start, &StyleConfig::default())
}

pub fn compile_with_config(
    markdown: &str,
    start: usize,
    styles: &StyleConfig,
) -> Result<CompileResult, CompileError> {
    Compiler::new(styles).compile(markdown, start)
}

/// Convert a fetched document to markup with the default styles.
pub fn decompile(document: &Document) -> Result<String, TreeShapeError> {
    decompile_with_config(document, &StyleConfig::default())
}

pub fn decompile_with_config(
    document: &Document,
    styles: &StyleConfig,
) -> Result<String, TreeShapeError> {
    let tree = DocumentTree::from_document(document, styles)?;
    Ok(decompiler::decompile(&tree))
}

/// Render an already built tree.
pub fn decompile_tree(tree: &DocumentTree) -> String {
    decompiler::decompile(tree)
}
