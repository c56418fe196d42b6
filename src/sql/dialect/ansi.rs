//! ANSI reference dialect.
//!
//! Used in tests and as the documented baseline. Real databases rarely
//! speak pure ANSI; prefer Postgres or DuckDB for actual generation.

use super::SqlDialect;

/// ANSI SQL reference dialect.
#[derive(Debug, Clone, Copy)]
pub struct Ansi;

impl SqlDialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    // No ILIKE; callers fall back to UPPER() wrapping.
}
