//! SQL generation from a query plan and resolved bindings.
//!
//! The generator is the last stage of the pipeline and the only place
//! query text is produced. Every literal flows through the token layer,
//! which owns escaping; no user-controlled string is ever concatenated
//! into SQL. Anything that cannot be bound safely is dropped with a
//! warning or escalated as a hard error, never emitted as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::{CompileError, CompileResult};
use crate::intent::{Aggregation, Intent, IntentKind, TimeScope};
use crate::planner::QueryPlan;
use crate::resolve::{temporal_predicate, EntityKind, ResolvedBinding, TemporalColumns};
use crate::schema::SchemaGraph;

use super::expr::{
    avg, col, count, count_distinct, func, lit_bool, lit_float, lit_int, lit_str, max, min, sum,
    BinaryOperator, Expr, ExprExt, Literal,
};
use super::numeric::parse_number;
use super::query::{Cte, JoinType, OrderByExpr, Query, SelectExpr, TableRef};
use super::Dialect;

/// `lhs op rhs` shape for free-text filter fragments. Anything that does
/// not match is dropped, never interpolated.
static FILTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(.+?)\s*(>=|<=|!=|<>|=|>|<)\s*(.+?)\s*$").unwrap()
});

/// `column IS [NOT] NULL`, the other shape schema default filters take.
static NULL_CHECK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*([A-Za-z_][A-Za-z0-9_]*)\s+IS\s+(NOT\s+)?NULL\s*$").unwrap()
});

/// Words in filter text that never name a column.
const FILLER_WORDS: &[&str] = &["total", "the", "of", "all", "paid", "with", "than", "a", "an"];

/// Structured output: the AST, its rendered text, and compile metadata.
#[derive(Debug, Clone)]
pub struct GeneratedQuery {
    pub query: Query,
    pub sql: String,
    pub metadata: QueryMetadata,
}

/// What the compiler did, for callers and logs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryMetadata {
    pub tables_used: Vec<String>,
    pub join_count: usize,
    pub where_count: usize,
    pub aggregations_applied: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct SelectColumn {
    table: String,
    column: String,
    aggregation: Option<Aggregation>,
}

impl SelectColumn {
    fn alias(&self) -> Option<String> {
        self.aggregation.map(|agg| agg_alias(agg, &self.column))
    }

    fn to_select_expr(&self) -> SelectExpr {
        let base = super::expr::table_col(&self.table, &self.column);
        match self.aggregation {
            Some(agg) => apply_aggregation(agg, base).alias(&agg_alias(agg, &self.column)),
            None => SelectExpr::new(base),
        }
    }
}

/// A filter that compares against an aggregated value and therefore needs
/// a CTE rather than a plain WHERE.
#[derive(Debug, Clone)]
struct AggregateFilter {
    alias: String,
    op: BinaryOperator,
    value: Expr,
}

pub struct SqlGenerator {
    dialect: Dialect,
    /// Safety LIMIT for plain retrieval queries.
    default_limit: u64,
    /// LIMIT for ranking queries when the question names no N.
    default_top_n: u64,
}

impl SqlGenerator {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            default_limit: 100,
            default_top_n: 10,
        }
    }

    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_default_top_n(mut self, n: u64) -> Self {
        self.default_top_n = n;
        self
    }

    /// Generate SQL for a plan, resolved bindings, and intent.
    ///
    /// Missing optional context (labels, unmatched filter fragments)
    /// degrades with a warning. Hard errors are reserved for outcomes
    /// where any emitted SQL would be wrong: no base table, every SELECT
    /// column unresolved, or the only requested metric unresolved.
    pub fn generate(
        &self,
        plan: &QueryPlan,
        bindings: &[ResolvedBinding],
        intent: &Intent,
        schema: &SchemaGraph,
    ) -> CompileResult<GeneratedQuery> {
        let mut warnings: Vec<String> = vec![];
        Self::check_essential(bindings)?;

        for binding in bindings.iter().filter(|b| !b.is_resolved()) {
            warnings.push(format!(
                "could not resolve '{}'; it does not affect the query",
                binding.entity_text
            ));
        }
        for binding in bindings {
            warnings.extend(binding.warnings.iter().cloned());
        }

        let mut selects = self.select_columns(plan, bindings, intent, schema)?;
        self.ensure_ranking_identifier(&mut selects, plan, intent, schema, &mut warnings);

        let mut conditions: Vec<Expr> = vec![];
        let mut aggregate_filters: Vec<AggregateFilter> = vec![];

        for binding in bindings.iter().filter(|b| b.is_resolved() && b.is_filter()) {
            if binding.kind == EntityKind::Temporal {
                continue;
            }
            match binding_predicate(binding) {
                Some(expr) => conditions.push(expr),
                None => {
                    if binding.column.is_some() {
                        warnings.push(format!(
                            "filter '{}' resolved to a column but no values; skipped",
                            binding.entity_text
                        ));
                    }
                }
            }
        }

        for fragment in &intent.filters {
            self.apply_text_filter(
                fragment,
                plan,
                schema,
                &selects,
                bindings,
                &mut conditions,
                &mut aggregate_filters,
                &mut warnings,
            );
        }

        let scope = intent.time_scope.clone().unwrap_or(TimeScope::Current);
        for table in plan.tables() {
            if let Some(def) = schema.table(table) {
                let cols = TemporalColumns::from_table(def);
                if let Some(expr) = temporal_predicate(table, &cols, &scope, &mut warnings) {
                    conditions.push(expr);
                }
            }
        }

        if !intent.wants_historical() {
            for table in plan.tables() {
                if let Some(def) = schema.table(table) {
                    for predicate in &def.default_filters {
                        conditions.push(default_filter_expr(table, predicate, schema));
                    }
                }
            }
        }

        let where_count = conditions.len() + aggregate_filters.len();
        let query = if aggregate_filters.is_empty() {
            self.flat_query(plan, &selects, conditions, intent)
        } else {
            self.cte_query(plan, &selects, conditions, aggregate_filters.clone(), intent)
        };

        let aggregations_applied: Vec<String> = selects
            .iter()
            .filter_map(|sc| {
                sc.aggregation
                    .map(|agg| format!("{}({})", agg.function_name(), sc.column))
            })
            .collect();

        let sql = query.to_sql(self.dialect);
        for w in &warnings {
            warn!(warning = w.as_str(), "query compiled with warning");
        }

        Ok(GeneratedQuery {
            sql,
            metadata: QueryMetadata {
                tables_used: plan.tables().iter().map(|t| t.to_string()).collect(),
                join_count: plan.join_path.edges.len(),
                where_count,
                aggregations_applied,
                warnings,
            },
            query,
        })
    }

    fn check_essential(bindings: &[ResolvedBinding]) -> CompileResult<()> {
        let metrics: Vec<&ResolvedBinding> = bindings
            .iter()
            .filter(|b| b.kind == EntityKind::Metric)
            .collect();
        if !metrics.is_empty() && metrics.iter().all(|b| !b.is_resolved()) {
            return Err(CompileError::UnresolvedEssentialEntity {
                text: metrics[0].entity_text.clone(),
            });
        }
        Ok(())
    }

    /// SELECT list: one column per resolved non-filter binding, plus any
    /// context columns the planner added. Aggregation precedence: explicit
    /// intent hint, then intent-driven default on numeric columns, then
    /// bare passthrough.
    fn select_columns(
        &self,
        plan: &QueryPlan,
        bindings: &[ResolvedBinding],
        intent: &Intent,
        schema: &SchemaGraph,
    ) -> CompileResult<Vec<SelectColumn>> {
        let mut selects: Vec<SelectColumn> = vec![];
        let mut push = |table: &str, column: &str| {
            if !selects.iter().any(|s| s.table == table && s.column == column) {
                selects.push(SelectColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                    aggregation: None,
                });
            }
        };

        let mut had_select_entity = false;
        for binding in bindings.iter().filter(|b| !b.is_filter()) {
            had_select_entity = true;
            if !binding.is_resolved() {
                continue;
            }
            if let (Some(table), Some(column)) = (&binding.table, &binding.column) {
                push(table, column);
            }
        }
        for required in plan.required_columns.iter().filter(|c| !c.filter_only) {
            push(&required.table, &required.column);
        }

        if selects.is_empty() {
            if had_select_entity {
                return Err(CompileError::AllColumnsUnresolved);
            }
            // Filter-only question: select everything from the base table.
            return Ok(vec![]);
        }

        let force_aggregate = intent.kind.is_aggregating();
        for sc in &mut selects {
            let numeric = schema
                .table(&sc.table)
                .and_then(|t| t.column(&sc.column))
                .map(|c| c.data_type.is_numeric())
                .unwrap_or(false);
            if numeric && (force_aggregate || !plan.aggregation_hints.is_empty()) {
                sc.aggregation =
                    Some(plan.aggregation_hints.first().copied().unwrap_or(Aggregation::Sum));
            }
        }

        Ok(selects)
    }

    /// A ranking over bare numbers is useless to a human. If every select
    /// column is aggregated, pull in the base table's label column or
    /// primary key as the row identifier.
    fn ensure_ranking_identifier(
        &self,
        selects: &mut Vec<SelectColumn>,
        plan: &QueryPlan,
        intent: &Intent,
        schema: &SchemaGraph,
        warnings: &mut Vec<String>,
    ) {
        if intent.kind != IntentKind::Ranking || selects.is_empty() {
            return;
        }
        if selects.iter().any(|s| s.aggregation.is_none()) {
            return;
        }

        let Some(table) = schema.table(&plan.base_table) else {
            return;
        };
        let identifier = table
            .label_column
            .clone()
            .or_else(|| table.primary_key.clone())
            .or_else(|| {
                table
                    .columns
                    .iter()
                    .find(|c| !c.data_type.is_numeric())
                    .map(|c| c.name.clone())
            });

        match identifier {
            Some(column) => selects.insert(
                0,
                SelectColumn {
                    table: plan.base_table.clone(),
                    column,
                    aggregation: None,
                },
            ),
            None => warnings.push(format!(
                "no identifying column found on '{}' for ranking output",
                plan.base_table
            )),
        }
    }

    /// Parse one free-text filter fragment into a predicate, routing
    /// comparisons against aggregated columns to the CTE path. Fragments
    /// that cannot be parsed into `column op value` are dropped with a
    /// warning; verbatim interpolation is an injection risk.
    #[allow(clippy::too_many_arguments)]
    fn apply_text_filter(
        &self,
        fragment: &str,
        plan: &QueryPlan,
        schema: &SchemaGraph,
        selects: &[SelectColumn],
        bindings: &[ResolvedBinding],
        conditions: &mut Vec<Expr>,
        aggregate_filters: &mut Vec<AggregateFilter>,
        warnings: &mut Vec<String>,
    ) {
        let parsed = FILTER_RE.captures(fragment).and_then(|caps| {
            let op = parse_operator(&caps[2])?;
            let value = parse_filter_value(&caps[3])?;
            let column = match_filter_column(&caps[1], plan, schema)?;
            Some((column, op, value))
        });

        let Some(((table, column), op, value)) = parsed else {
            let covered = bindings.iter().any(|b| {
                b.is_resolved() && b.is_filter() && fragment_mentions(fragment, &b.entity_text)
            });
            if covered {
                warnings.push(format!(
                    "filter '{}' already covered by a resolved entity; dropped",
                    fragment
                ));
            } else {
                warnings.push(format!("could not parse filter '{}'; dropped", fragment));
            }
            return;
        };

        // A text literal against a numeric column is a guaranteed type
        // error at execution; treat it like any other unparsable filter.
        let numeric = schema
            .table(&table)
            .and_then(|t| t.column(&column))
            .map(|c| c.data_type.is_numeric())
            .unwrap_or(false);
        if numeric && matches!(&value, Expr::Literal(Literal::String(_))) {
            warnings.push(format!(
                "filter '{}' compares numeric column {}.{} against text; dropped",
                fragment, table, column
            ));
            return;
        }

        let aggregated = selects
            .iter()
            .find(|s| s.table == table && s.column == column && s.aggregation.is_some());
        match aggregated.and_then(|s| s.alias()) {
            Some(alias) => aggregate_filters.push(AggregateFilter { alias, op, value }),
            None => {
                conditions.push(super::expr::table_col(&table, &column).binop(op, value));
            }
        }
    }

    fn flat_query(
        &self,
        plan: &QueryPlan,
        selects: &[SelectColumn],
        conditions: Vec<Expr>,
        intent: &Intent,
    ) -> Query {
        let mut query = Query::new();
        query = if selects.is_empty() {
            query.select_star()
        } else {
            query.select(selects.iter().map(|s| s.to_select_expr()).collect::<Vec<_>>())
        };
        query = add_joins(query.from(TableRef::new(&plan.base_table)), plan);
        for condition in conditions {
            query = query.filter(condition);
        }

        let has_agg = selects.iter().any(|s| s.aggregation.is_some());
        if has_agg {
            let group: Vec<Expr> = selects
                .iter()
                .filter(|s| s.aggregation.is_none())
                .map(|s| super::expr::table_col(&s.table, &s.column))
                .collect();
            if !group.is_empty() {
                query = query.group_by(group);
            }
        }

        self.apply_ordering(query, selects, intent, |s| match s.alias() {
            Some(alias) => col(&alias),
            None => super::expr::table_col(&s.table, &s.column),
        })
    }

    /// Post-aggregation filtering: compute the aggregates in a CTE, then
    /// filter on the aliased results in the outer query. An aggregate
    /// inside WHERE is invalid SQL; this is the correct shape.
    fn cte_query(
        &self,
        plan: &QueryPlan,
        selects: &[SelectColumn],
        conditions: Vec<Expr>,
        aggregate_filters: Vec<AggregateFilter>,
        intent: &Intent,
    ) -> Query {
        let mut inner = Query::new()
            .select(selects.iter().map(|s| s.to_select_expr()).collect::<Vec<_>>());
        inner = add_joins(inner.from(TableRef::new(&plan.base_table)), plan);
        for condition in conditions {
            inner = inner.filter(condition);
        }
        let group: Vec<Expr> = selects
            .iter()
            .filter(|s| s.aggregation.is_none())
            .map(|s| super::expr::table_col(&s.table, &s.column))
            .collect();
        if !group.is_empty() {
            inner = inner.group_by(group);
        }

        let outer_cols: Vec<SelectExpr> = selects
            .iter()
            .map(|s| match s.alias() {
                Some(alias) => SelectExpr::new(col(&alias)),
                None => SelectExpr::new(col(&s.column)),
            })
            .collect();

        let mut outer = Query::new()
            .with_cte(Cte::new("aggregated", inner))
            .select(outer_cols)
            .from(TableRef::new("aggregated"));
        for filter in aggregate_filters {
            outer = outer.filter(col(&filter.alias).binop(filter.op, filter.value));
        }

        self.apply_ordering(outer, selects, intent, |s| match s.alias() {
            Some(alias) => col(&alias),
            None => col(&s.column),
        })
    }

    /// Intent-driven ORDER BY / LIMIT. Ranking orders by the primary
    /// aggregate descending; comparison orders by the grouping dimension;
    /// plain retrieval gets a safety LIMIT and no ordering.
    fn apply_ordering(
        &self,
        mut query: Query,
        selects: &[SelectColumn],
        intent: &Intent,
        column_expr: impl Fn(&SelectColumn) -> Expr,
    ) -> Query {
        match intent.kind {
            IntentKind::Ranking => {
                let metric = selects
                    .iter()
                    .find(|s| s.aggregation.is_some())
                    .or_else(|| selects.iter().find(|s| s.aggregation.is_none()));
                if let Some(metric) = metric {
                    query = query.order_by(vec![OrderByExpr::desc(column_expr(metric))]);
                }
                query.limit(intent.top_n.unwrap_or(self.default_top_n))
            }
            IntentKind::Comparison => {
                if let Some(dim) = selects.iter().find(|s| s.aggregation.is_none()) {
                    query = query.order_by(vec![OrderByExpr::asc(column_expr(dim))]);
                }
                query
            }
            IntentKind::Aggregate => query,
            IntentKind::Retrieval => query.limit(self.default_limit),
        }
    }
}

fn add_joins(mut query: Query, plan: &QueryPlan) -> Query {
    for edge in &plan.join_path.edges {
        let on = super::expr::table_col(&edge.from_table, &edge.from_column)
            .eq(super::expr::table_col(&edge.to_table, &edge.to_column));
        let join_type = if edge.optional {
            JoinType::Left
        } else {
            JoinType::Inner
        };
        query = query.join(join_type, TableRef::new(&edge.to_table), on);
    }
    query
}

/// WHERE predicate for a value binding. Multi-value bindings collapse to
/// a single IN-list; unverified values compare case-insensitively.
fn binding_predicate(binding: &ResolvedBinding) -> Option<Expr> {
    let table = binding.table.as_deref()?;
    let column = binding.column.as_deref()?;
    if binding.bound_values.is_empty() {
        return None;
    }

    let target = super::expr::table_col(table, column);
    let expr = match (&binding.bound_values[..], binding.case_insensitive) {
        ([single], false) => target.eq(lit_str(single)),
        ([single], true) => target.ci_eq(lit_str(single)),
        (values, false) => target.in_list(values.iter().map(|v| lit_str(v)).collect()),
        (values, true) => func("UPPER", vec![target]).in_list(
            values
                .iter()
                .map(|v| lit_str(&v.to_uppercase()))
                .collect(),
        ),
    };
    Some(expr)
}

/// Default table filters are operator-authored schema text, parsed into
/// a structured predicate where possible and carried as trusted raw text
/// otherwise. Parsed forms are qualified with the owning table; in a
/// multi-table join an unqualified column name is ambiguous.
fn default_filter_expr(table: &str, predicate: &str, schema: &SchemaGraph) -> Expr {
    let column_exists = |column: &str| {
        schema
            .table(table)
            .and_then(|t| t.column(column))
            .is_some()
    };

    if let Some(caps) = NULL_CHECK_RE.captures(predicate) {
        let column = caps[1].trim();
        if column_exists(column) {
            let target = super::expr::table_col(table, column);
            return if caps.get(2).is_some() {
                target.is_not_null()
            } else {
                target.is_null()
            };
        }
    }

    let parsed = FILTER_RE.captures(predicate).and_then(|caps| {
        let column = caps[1].trim();
        if !column_exists(column) {
            return None;
        }
        let op = parse_operator(&caps[2])?;
        let value = parse_filter_value(&caps[3])?;
        Some(super::expr::table_col(table, column).binop(op, value))
    });
    parsed.unwrap_or_else(|| Expr::Raw(predicate.to_string()))
}

fn parse_operator(text: &str) -> Option<BinaryOperator> {
    match text {
        "=" => Some(BinaryOperator::Eq),
        "!=" | "<>" => Some(BinaryOperator::Ne),
        ">" => Some(BinaryOperator::Gt),
        ">=" => Some(BinaryOperator::Gte),
        "<" => Some(BinaryOperator::Lt),
        "<=" => Some(BinaryOperator::Lte),
        _ => None,
    }
}

/// Filter RHS: numeric shorthand first, then booleans, then quoted or
/// bare strings (escaped by the token layer like any other literal).
fn parse_filter_value(text: &str) -> Option<Expr> {
    let trimmed = text.trim();
    if let Some(number) = parse_number(trimmed) {
        return Some(number.to_expr());
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => return Some(lit_bool(true)),
        "false" => return Some(lit_bool(false)),
        "null" => return None,
        _ => {}
    }
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(trimmed);
    if unquoted.is_empty() {
        return None;
    }
    Some(lit_str(unquoted))
}

/// Map filter-text words onto a column of a planned table. Exact name
/// match wins; otherwise the first planned column sharing a meaningful
/// word. Plan order and schema column order make the choice stable.
fn match_filter_column(
    lhs: &str,
    plan: &QueryPlan,
    schema: &SchemaGraph,
) -> Option<(String, String)> {
    use inflector::Inflector as _;

    let words: Vec<String> = lhs
        .to_snake_case()
        .split('_')
        .filter(|w| !w.is_empty() && !FILLER_WORDS.contains(w))
        .map(|w| w.to_singular())
        .collect();
    if words.is_empty() {
        return None;
    }

    let joined = words.join("_");
    for table in plan.tables() {
        let Some(def) = schema.table(table) else { continue };
        if def.column(&joined).is_some() {
            return Some((table.to_string(), joined));
        }
    }

    for table in plan.tables() {
        let Some(def) = schema.table(table) else { continue };
        for column in &def.columns {
            let column_words: Vec<String> = column
                .name
                .split('_')
                .map(|w| w.to_singular())
                .collect();
            let shared = words
                .iter()
                .any(|w| w.len() > 2 && column_words.iter().any(|c| c == w));
            if shared {
                return Some((table.to_string(), column.name.clone()));
            }
        }
    }
    None
}

fn fragment_mentions(fragment: &str, entity_text: &str) -> bool {
    !entity_text.is_empty()
        && fragment
            .to_lowercase()
            .contains(&entity_text.to_lowercase())
}

fn apply_aggregation(agg: Aggregation, expr: Expr) -> Expr {
    match agg {
        Aggregation::Sum => sum(expr),
        Aggregation::Avg => avg(expr),
        Aggregation::Count => count(expr),
        Aggregation::CountDistinct => count_distinct(expr),
        Aggregation::Min => min(expr),
        Aggregation::Max => max(expr),
    }
}

fn agg_alias(agg: Aggregation, column: &str) -> String {
    match agg {
        Aggregation::Sum => format!("total_{}", column),
        Aggregation::Avg => format!("avg_{}", column),
        Aggregation::Count => format!("count_{}", column),
        Aggregation::CountDistinct => format!("unique_{}", column),
        Aggregation::Min => format!("min_{}", column),
        Aggregation::Max => format!("max_{}", column),
    }
}
