//! DimensionCatalog - discovery and analysis of dimension column values.
//!
//! For a categorical column the catalog answers: which distinct values
//! exist, how often, what case convention they follow, and what structural
//! patterns (shared prefixes/suffixes, fixed lengths) they carry. Results
//! are TTL-cached because discovery runs a query against the customer
//! database through the executor collaborator.

pub mod pattern;

pub use pattern::{detect_case_convention, detect_patterns, CaseConvention, PatternKind, ValuePattern};

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collab::QueryExecutor;
use crate::sql::expr::{col, count_star, ExprExt};
use crate::sql::{Dialect, Query, TableRef};

/// One distinct value of a dimension column, with its row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionValue {
    pub value: String,
    pub count: u64,
}

/// The analyzed value set of a dimension column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSet {
    pub values: Vec<DimensionValue>,
    pub case_convention: CaseConvention,
    pub patterns: Vec<ValuePattern>,
    /// True when discovery failed and no values are known. Binding then
    /// falls back to case-insensitive comparison against the entity text's
    /// candidates rather than an exact value list.
    pub implicit: bool,
}

impl ValueSet {
    /// The degraded "no values known" set.
    pub fn implicit() -> Self {
        Self {
            values: vec![],
            case_convention: CaseConvention::Mixed,
            patterns: vec![],
            implicit: true,
        }
    }

    /// Analyze a raw value list into a full set.
    pub fn analyze(values: Vec<DimensionValue>) -> Self {
        let texts: Vec<String> = values.iter().map(|v| v.value.clone()).collect();
        Self {
            case_convention: detect_case_convention(&texts),
            patterns: detect_patterns(&texts),
            values,
            implicit: false,
        }
    }

    /// Values (case-insensitively) containing or matching the given text.
    pub fn matching_values(&self, text: &str) -> Vec<&str> {
        let needle = text.to_lowercase();
        self.values
            .iter()
            .filter(|v| v.value.to_lowercase().contains(&needle))
            .map(|v| v.value.as_str())
            .collect()
    }
}

struct CachedSet {
    fetched_at: Instant,
    set: ValueSet,
}

/// Catalog of dimension values, keyed by (table, column).
pub struct DimensionCatalog {
    executor: Arc<dyn QueryExecutor>,
    dialect: Dialect,
    ttl: Duration,
    cache: DashMap<(String, String), CachedSet>,
}

impl DimensionCatalog {
    pub fn new(executor: Arc<dyn QueryExecutor>, dialect: Dialect, ttl: Duration) -> Self {
        Self {
            executor,
            dialect,
            ttl,
            cache: DashMap::new(),
        }
    }

    /// Get the value set for a dimension column.
    ///
    /// If the column declares an explicit lookup table, that table is
    /// queried directly; otherwise an ad-hoc DISTINCT query runs against
    /// the owning table. Executor failure degrades to
    /// [`ValueSet::implicit`] - it never fails the compilation.
    pub async fn values(
        &self,
        table: &str,
        column: &str,
        lookup_table: Option<&str>,
    ) -> ValueSet {
        let key = (table.to_string(), column.to_string());
        if let Some(cached) = self.cache.get(&key) {
            if cached.fetched_at.elapsed() < self.ttl {
                return cached.set.clone();
            }
        }

        let source = lookup_table.unwrap_or(table);
        let sql = Self::discovery_query(source, column).to_sql(self.dialect);

        let set = match self.executor.query(&sql).await {
            Ok(rows) => {
                let mut values = Vec::with_capacity(rows.len());
                for row in rows {
                    let Some(value) = row.first().and_then(|v| v.as_str()) else {
                        continue;
                    };
                    let count = row.get(1).and_then(|v| v.as_u64()).unwrap_or(0);
                    values.push(DimensionValue {
                        value: value.to_string(),
                        count,
                    });
                }
                // Deterministic ordering regardless of executor row order
                values.sort_by(|a, b| a.value.cmp(&b.value));
                ValueSet::analyze(values)
            }
            Err(e) => {
                warn!(table, column, error = %e, "dimension value discovery failed; treating column as implicit");
                ValueSet::implicit()
            }
        };

        // Degraded sets are not cached, so a recovered executor repopulates
        // on the next query rather than after a full TTL.
        if !set.implicit {
            self.cache.insert(
                key,
                CachedSet {
                    fetched_at: Instant::now(),
                    set: set.clone(),
                },
            );
        }

        set
    }

    /// Drop all cached value sets (e.g. after a schema reload).
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    fn discovery_query(table: &str, column: &str) -> Query {
        Query::new()
            .select(vec![
                col(column).into(),
                count_star().alias("value_count"),
            ])
            .distinct()
            .from(TableRef::new(table))
            .group_by(vec![col(column)])
    }
}
