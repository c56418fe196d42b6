//! DuckDB dialect.
//!
//! DuckDB tracks PostgreSQL syntax for everything this generator emits,
//! including `ILIKE`, so the implementations are identical apart from the
//! name.

use super::SqlDialect;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn supports_ilike(&self) -> bool {
        true
    }
}
