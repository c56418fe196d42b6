//! Temporal and versioned column resolution.
//!
//! Tables that keep superseded rows mark their columns with
//! `temporal_role` / `version_role`. Combined with the query's
//! [`TimeScope`] this yields the row-currency predicate: `end_date IS
//! NULL` for current rows, a point-in-time range for as-of queries, or
//! nothing at all for historical queries.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::intent::TimeScope;
use crate::schema::{Table, TemporalRole, VersionRole};
use crate::sql::expr::{lit_bool, lit_str, table_col, Expr, ExprExt};

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap()
});

/// The temporal/version columns a table declares, by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemporalColumns {
    pub effective_date: Option<String>,
    pub end_date: Option<String>,
    pub latest_flag: Option<String>,
}

impl TemporalColumns {
    pub fn from_table(table: &Table) -> Self {
        let mut cols = Self::default();
        for column in &table.columns {
            match column.temporal_role {
                TemporalRole::EffectiveDate => cols.effective_date = Some(column.name.clone()),
                TemporalRole::EndDate => cols.end_date = Some(column.name.clone()),
                TemporalRole::None => {}
            }
            if column.version_role == VersionRole::LatestFlag {
                cols.latest_flag = Some(column.name.clone());
            }
        }
        cols
    }

    pub fn is_temporal(&self) -> bool {
        self.effective_date.is_some() || self.end_date.is_some() || self.latest_flag.is_some()
    }
}

/// Build the row-currency predicate for a table under a time scope.
///
/// Returns `None` when the table has no temporal columns, when the scope
/// is historical, or when a supplied date is not a valid ISO `YYYY-MM-DD`
/// string. Invalid dates fall back to current-rows semantics with a
/// warning rather than failing the compilation.
pub fn temporal_predicate(
    table: &str,
    cols: &TemporalColumns,
    scope: &TimeScope,
    warnings: &mut Vec<String>,
) -> Option<Expr> {
    if !cols.is_temporal() {
        return None;
    }

    match scope {
        TimeScope::Historical => None,
        TimeScope::Current => current_predicate(table, cols),
        TimeScope::AsOf { date } => {
            if !ISO_DATE.is_match(date) {
                warnings.push(format!(
                    "ignoring invalid as-of date '{}'; using current rows",
                    date
                ));
                return current_predicate(table, cols);
            }
            as_of_predicate(table, cols, date)
        }
        TimeScope::Range { from, to } => {
            if !ISO_DATE.is_match(from) || !ISO_DATE.is_match(to) {
                warnings.push(format!(
                    "ignoring invalid date range '{}'..'{}'; using current rows",
                    from, to
                ));
                return current_predicate(table, cols);
            }
            let effective = cols.effective_date.as_deref()?;
            Some(table_col(table, effective).between(lit_str(from), lit_str(to)))
        }
    }
}

fn current_predicate(table: &str, cols: &TemporalColumns) -> Option<Expr> {
    if let Some(end) = &cols.end_date {
        return Some(table_col(table, end).is_null());
    }
    cols.latest_flag
        .as_ref()
        .map(|flag| table_col(table, flag).eq(lit_bool(true)))
}

fn as_of_predicate(table: &str, cols: &TemporalColumns, date: &str) -> Option<Expr> {
    let effective = cols.effective_date.as_deref();
    let end = cols.end_date.as_deref();
    match (effective, end) {
        (Some(eff), Some(end)) => Some(
            table_col(table, eff).lte(lit_str(date)).and(
                table_col(table, end)
                    .is_null()
                    .or(table_col(table, end).gt(lit_str(date)))
                    .paren(),
            ),
        ),
        (Some(eff), None) => Some(table_col(table, eff).lte(lit_str(date))),
        (None, Some(end)) => Some(
            table_col(table, end)
                .is_null()
                .or(table_col(table, end).gt(lit_str(date)))
                .paren(),
        ),
        (None, None) => current_predicate(table, cols),
    }
}
