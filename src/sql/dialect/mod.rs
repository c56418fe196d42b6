//! SQL dialect definitions and formatting rules.
//!
//! A trait-based abstraction for the dialect differences the generator
//! actually exercises:
//!
//! - Identifier quoting: `"` (ANSI/Postgres/DuckDB)
//! - String literal escaping (doubled single quotes)
//! - Boolean literals
//! - Case-insensitive comparison: native `ILIKE` vs `UPPER()` wrapping
//! - LIMIT emission
//!
//! Identifier quoting is deliberately pluggable rather than hard-coded;
//! adding a bracket-quoting dialect means one new file here and nothing
//! anywhere else.

mod ansi;
mod duckdb;
mod postgres;

pub use ansi::Ansi;
pub use duckdb::DuckDb;
pub use postgres::Postgres;

use super::token::{Token, TokenStream};

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// All supported dialects use single quotes with `''` for escaping.
    /// This is the single point where user-derived values meet SQL text.
    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str {
        if b {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    /// Whether the dialect has a native case-insensitive LIKE (`ILIKE`).
    ///
    /// Dialects without it get `UPPER(lhs) = UPPER(rhs)` /
    /// `UPPER(lhs) LIKE UPPER(pattern)` instead.
    fn supports_ilike(&self) -> bool {
        false
    }

    /// Emit a LIMIT clause.
    fn emit_limit(&self, limit: u64) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Limit)
            .space()
            .push(Token::LitInt(limit as i64));
        ts
    }

    /// Format a date literal.
    fn format_date_literal(&self, date: &str) -> String {
        format!("DATE '{}'", date.replace('\'', "''"))
    }
}

/// Supported dialects as a copyable enum.
///
/// The enum dispatches to the trait implementations, letting callers pass
/// a plain `Dialect` value around without trait objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// ANSI reference dialect, used in tests and documentation.
    Ansi,
    #[default]
    Postgres,
    DuckDb,
}

impl Dialect {
    fn as_dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Ansi => &Ansi,
            Dialect::Postgres => &Postgres,
            Dialect::DuckDb => &DuckDb,
        }
    }

    /// Parse a dialect name (case-insensitive).
    pub fn parse(name: &str) -> Option<Dialect> {
        match name.to_lowercase().as_str() {
            "ansi" => Some(Dialect::Ansi),
            "postgres" | "postgresql" | "pg" => Some(Dialect::Postgres),
            "duckdb" => Some(Dialect::DuckDb),
            _ => None,
        }
    }
}

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.as_dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.as_dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.as_dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.as_dialect().format_bool(b)
    }

    fn supports_ilike(&self) -> bool {
        self.as_dialect().supports_ilike()
    }

    fn emit_limit(&self, limit: u64) -> TokenStream {
        self.as_dialect().emit_limit(limit)
    }

    fn format_date_literal(&self, date: &str) -> String {
        self.as_dialect().format_date_literal(date)
    }
}
