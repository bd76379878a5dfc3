//! Error types

use std::fmt;

use thiserror::Error;

use crate::block::TableSpec;
use crate::directive::Directive;
use crate::offset::TextRange;
use crate::population::CommittedTable;

/// A paragraph style was appended after a text style on an overlapping range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "paragraph style on {}..{} would reset text style on {}..{}",
    .paragraph.start, .paragraph.end, .text.start, .text.end
)]
pub struct OrderingError {
    pub paragraph: TextRange,
    pub text: TextRange,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Malformed table. Nothing has been sent anywhere.
    #[error("Line {line}: {message}")]
    StructuralParse { line: usize, message: String },

    #[error("Directive order error: {0}")]
    Ordering(#[from] OrderingError),
}

impl CompileError {
    pub fn structural(line: usize, message: impl Into<String>) -> Self {
        Self::StructuralParse {
            line,
            message: message.into(),
        }
    }

    /// 1-based source line of a structural error.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::StructuralParse { line, .. } => Some(*line),
            Self::Ordering(_) => None,
        }
    }
}

/// A position could not be resolved in a fetched document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Could not find table at index {start_index}")]
    TableNotFound { start_index: usize },

    #[error("Cell ({row}, {column}) out of range")]
    CellOutOfRange { row: usize, column: usize },

    #[error("Could not determine cell index for ({row}, {column})")]
    EmptyCell { row: usize, column: usize },
}

/// The fetched document does not have the shape the decompiler expects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeShapeError {
    #[error("Table cell ({row}, {column}) has no paragraph content")]
    EmptyCell { row: usize, column: usize },

    #[error("Table has no rows")]
    EmptyTable,

    #[error("Table row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Failure reported by the document service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ServiceError(pub String);

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Which batch of a write a commit belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPhase {
    Text,
    TableStructure,
    TablePopulation,
    Replace,
    Format,
}

impl fmt::Display for CommitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitPhase::Text => "text",
            CommitPhase::TableStructure => "table structure",
            CommitPhase::TablePopulation => "table population",
            CommitPhase::Replace => "replace",
            CommitPhase::Format => "format",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Fetching document failed: {source}")]
    Fetch {
        /// Set when a table skeleton was already committed.
        after_structure: bool,
        source: ServiceError,
    },

    #[error("Commit of {phase} batch ({} requests) failed: {source}", .batch.len())]
    RemoteCommit {
        phase: CommitPhase,
        batch: Vec<Directive>,
        source: ServiceError,
    },

    /// The table skeleton exists in the document but its cells are empty.
    #[error("Table inserted at {} but not populated: {source}", .table.insertion_index())]
    AddressResolution {
        table: Box<CommittedTable>,
        source: AddressError,
    },

    /// A write stopped part way through its tables.
    ///
    /// To finish it, retry `unpopulated` with `Session::populate_table`
    /// first, then hand `pending` to `Session::write_tables`. Pending tables
    /// sit earlier in the document, so their insertion indices still hold.
    #[error("Stopped after writing {written} tables: {source}")]
    TablesIncomplete {
        written: usize,
        /// The failing table, if its structure was committed.
        unpopulated: Option<Box<CommittedTable>>,
        /// Tables not yet inserted, in write order.
        pending: Vec<TableSpec>,
        source: Box<SessionError>,
    },

    #[error("Unexpected document shape: {0}")]
    TreeShape(#[from] TreeShapeError),

    #[error("Text not found: {0}")]
    TextNotFound(String),
}

impl SessionError {
    /// Whether some of a write's tables reached the document and the rest
    /// did not, or a table skeleton was left without content.
    pub fn is_partial(&self) -> bool {
        match self {
            SessionError::AddressResolution { .. } => true,
            SessionError::TablesIncomplete {
                written,
                unpopulated,
                source,
                ..
            } => *written > 0 || unpopulated.is_some() || source.is_partial(),
            SessionError::Fetch {
                after_structure, ..
            } => *after_structure,
            SessionError::RemoteCommit { phase, .. } => *phase == CommitPhase::TablePopulation,
            _ => false,
        }
    }
}
