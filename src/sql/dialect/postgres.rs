//! PostgreSQL dialect.
//!
//! - ANSI identifier quoting (`"`)
//! - Native boolean type
//! - Native `ILIKE`
//! - `EXTRACT(unit FROM date)` and standard CTEs

use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn supports_ilike(&self) -> bool {
        true
    }
}
