//! Query planning: from resolved bindings to a minimal join tree.
//!
//! The planner picks an anchor table, connects every other required table
//! through the schema graph within hard hop/table budgets, and records
//! which columns the generator must select or filter on. It never invents
//! joins; every edge comes from a declared relationship.

use crate::error::{CompileError, CompileResult};
use crate::intent::{Aggregation, Intent};
use crate::resolve::ResolvedBinding;
use crate::schema::{JoinPath, PathError, SchemaGraph};

/// Hard budgets for join-path search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerCaps {
    pub max_hops: usize,
    pub max_tables: usize,
}

impl Default for PlannerCaps {
    fn default() -> Self {
        Self {
            max_hops: 3,
            max_tables: 5,
        }
    }
}

/// A column the generated query must reference.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredColumn {
    pub table: String,
    pub column: String,
    /// The entity text this column came from, kept for diagnostics.
    pub entity_text: String,
    /// Filter-only columns contribute predicates but are not selected.
    pub filter_only: bool,
}

/// The planned shape of one query: anchor, joins, and column demands.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub base_table: String,
    pub join_path: JoinPath,
    pub required_columns: Vec<RequiredColumn>,
    pub aggregation_hints: Vec<Aggregation>,
}

impl QueryPlan {
    /// Every table the plan touches, base first, then in join order.
    pub fn tables(&self) -> Vec<&str> {
        let mut out = vec![self.base_table.as_str()];
        for t in self.join_path.tables() {
            if !out.contains(&t) {
                out.push(t);
            }
        }
        out
    }
}

pub struct QueryPlanner;

impl QueryPlanner {
    /// Plan the table set and join tree for a set of resolved bindings.
    ///
    /// The anchor is the table holding the most required columns; ties go
    /// to the table whose primary key is referenced by another table, then
    /// to the lexically smallest name. The rule is arbitrary but must be
    /// deterministic: the same bindings always produce the same plan.
    pub fn plan(
        bindings: &[ResolvedBinding],
        schema: &SchemaGraph,
        intent: &Intent,
        caps: &PlannerCaps,
    ) -> CompileResult<QueryPlan> {
        let mut tables: Vec<String> = vec![];
        let mut required_columns: Vec<RequiredColumn> = vec![];

        for binding in bindings.iter().filter(|b| b.is_resolved()) {
            let Some(table) = &binding.table else { continue };
            let table_def = schema
                .table(table)
                .ok_or_else(|| CompileError::UnknownTable(table.clone()))?;
            if !tables.contains(table) {
                tables.push(table.clone());
            }

            if let Some(column) = &binding.column {
                if table_def.column(column).is_none() {
                    return Err(CompileError::UnknownColumn {
                        table: table.clone(),
                        column: column.clone(),
                    });
                }
                required_columns.push(RequiredColumn {
                    table: table.clone(),
                    column: column.clone(),
                    entity_text: binding.entity_text.clone(),
                    filter_only: binding.is_filter(),
                });
            }
        }

        if tables.is_empty() {
            return Err(CompileError::NoBaseTable);
        }

        let base_table = Self::pick_anchor(&tables, &required_columns, schema);
        let targets: Vec<&str> = tables
            .iter()
            .map(String::as_str)
            .filter(|t| *t != base_table)
            .collect();

        let join_path = schema
            .find_join_tree(&base_table, &targets, caps.max_hops, caps.max_tables)
            .map_err(path_error_to_compile)?;

        Ok(QueryPlan {
            base_table,
            join_path,
            required_columns,
            aggregation_hints: intent.aggregations.clone(),
        })
    }

    fn pick_anchor(
        tables: &[String],
        required_columns: &[RequiredColumn],
        schema: &SchemaGraph,
    ) -> String {
        let mut sorted: Vec<&String> = tables.iter().collect();
        sorted.sort_unstable();

        let column_count = |table: &str| {
            required_columns
                .iter()
                .filter(|c| c.table == table)
                .count()
        };

        let mut best = sorted[0];
        for table in &sorted[1..] {
            let (a, b) = (column_count(table), column_count(best));
            if a > b || (a == b && schema.is_referenced(table) && !schema.is_referenced(best)) {
                best = table;
            }
        }
        best.clone()
    }

    /// Try to pull in one extra table purely for a human-readable label
    /// column behind a foreign key. Bounded by the same caps as the main
    /// plan; any failure leaves the plan untouched. A missing label never
    /// fails a query.
    pub fn add_label_column(plan: &mut QueryPlan, schema: &SchemaGraph, caps: &PlannerCaps) {
        // The base table's own label costs nothing.
        if let Some(table) = schema.table(&plan.base_table) {
            if let Some(label) = &table.label_column {
                if !plan_has_column(plan, &plan.base_table.clone(), label) {
                    plan.required_columns.push(RequiredColumn {
                        table: plan.base_table.clone(),
                        column: label.clone(),
                        entity_text: String::new(),
                        filter_only: false,
                    });
                }
                return;
            }
        }

        let current: Vec<String> = plan.tables().iter().map(|t| t.to_string()).collect();

        // table_names() is sorted, so the candidate choice is stable.
        for name in schema.table_names() {
            if current.iter().any(|t| t == name) {
                continue;
            }
            let Some(label) = schema.table(name).and_then(|t| t.label_column.clone()) else {
                continue;
            };

            let mut targets: Vec<&str> = current
                .iter()
                .map(String::as_str)
                .filter(|t| *t != plan.base_table)
                .collect();
            targets.push(name);

            if let Ok(path) =
                schema.find_join_tree(&plan.base_table, &targets, caps.max_hops, caps.max_tables)
            {
                plan.join_path = path;
                plan.required_columns.push(RequiredColumn {
                    table: name.to_string(),
                    column: label,
                    entity_text: String::new(),
                    filter_only: false,
                });
                return;
            }
        }
    }
}

fn plan_has_column(plan: &QueryPlan, table: &str, column: &str) -> bool {
    plan.required_columns
        .iter()
        .any(|c| c.table == table && c.column == column)
}

fn path_error_to_compile(err: PathError) -> CompileError {
    match err {
        PathError::NoPath { from, to } => CompileError::NoPathFound { from, to },
        PathError::TooComplex {
            tables,
            max_hops,
            max_tables,
        } => CompileError::TooComplexJoin {
            tables,
            max_hops,
            max_tables,
        },
        PathError::UnknownTable(name) => CompileError::UnknownTable(name),
    }
}
