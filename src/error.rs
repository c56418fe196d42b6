//! Unified error types for query compilation.
//!
//! One error type covers the whole pipeline: schema loading, join-path
//! search, entity resolution, and SQL generation. Recoverable conditions
//! (pattern misses, optional-context misses, collaborator timeouts on
//! enrichment calls) are absorbed as warnings and never appear here; this
//! type is reserved for outcomes where emitting SQL would be wrong.

use std::fmt;

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Unified error type for query compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Referenced a table that doesn't exist in the schema graph.
    UnknownTable(String),

    /// Referenced a column that doesn't exist on a table.
    UnknownColumn { table: String, column: String },

    /// Could not find a join path between tables.
    NoPathFound { from: String, to: String },

    /// Connecting the required tables exceeds the hop or table budget.
    TooComplexJoin {
        tables: Vec<String>,
        max_hops: usize,
        max_tables: usize,
    },

    /// An entity essential to the query (the only metric, or a required
    /// filter) resolved to zero candidates.
    UnresolvedEssentialEntity { text: String },

    /// No base table could be determined from the resolved entities.
    NoBaseTable,

    /// Every candidate SELECT column is unresolved.
    AllColumnsUnresolved,

    /// The schema definition is internally inconsistent.
    InvalidSchema(String),

    /// An essential external call (intent/entity extraction) failed.
    CollaboratorFailure { what: String, cause: String },

    /// The compilation deadline elapsed before an essential step finished.
    DeadlineExceeded { what: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnknownTable(name) => {
                write!(f, "Unknown table: '{}'", name)
            }
            CompileError::UnknownColumn { table, column } => {
                write!(f, "Unknown column '{}' on table '{}'", column, table)
            }
            CompileError::NoPathFound { from, to } => {
                write!(f, "No join path from '{}' to '{}'", from, to)
            }
            CompileError::TooComplexJoin {
                tables,
                max_hops,
                max_tables,
            } => {
                write!(
                    f,
                    "Query too complex: connecting [{}] exceeds the limit of {} hops / {} tables",
                    tables.join(", "),
                    max_hops,
                    max_tables
                )
            }
            CompileError::UnresolvedEssentialEntity { text } => {
                write!(
                    f,
                    "Could not resolve '{}' to any table or column. Try rephrasing.",
                    text
                )
            }
            CompileError::NoBaseTable => {
                write!(f, "No base table could be determined from the question")
            }
            CompileError::AllColumnsUnresolved => {
                write!(f, "None of the requested columns could be resolved")
            }
            CompileError::InvalidSchema(msg) => {
                write!(f, "Invalid schema: {}", msg)
            }
            CompileError::CollaboratorFailure { what, cause } => {
                write!(f, "External call '{}' failed: {}", what, cause)
            }
            CompileError::DeadlineExceeded { what } => {
                write!(f, "Compilation deadline exceeded during '{}'", what)
            }
        }
    }
}

impl std::error::Error for CompileError {}
