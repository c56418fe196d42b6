//! End-to-end generation scenarios: plan, bindings, and intent in,
//! finished SQL text out.

use sqlloom::intent::{Aggregation, Intent, IntentKind, TimeScope};
use sqlloom::planner::{PlannerCaps, QueryPlanner};
use sqlloom::resolve::{EntityKind, MatchKind, ResolvedBinding};
use sqlloom::schema::{
    Column, DataType, Relationship, SchemaDef, SchemaGraph, Table, TemporalRole,
};
use sqlloom::sql::generate::{GeneratedQuery, SqlGenerator};
use sqlloom::sql::Dialect;

fn rel(from: (&str, &str), to: (&str, &str)) -> Relationship {
    Relationship {
        from_table: from.0.into(),
        from_column: from.1.into(),
        to_table: to.0.into(),
        to_column: to.1.into(),
        optional: false,
    }
}

fn schema() -> SchemaGraph {
    SchemaGraph::build(SchemaDef {
        tables: vec![
            Table::new("clients")
                .with_primary_key("client_id")
                .with_label_column("client_name")
                .with_column(Column::new("client_id", DataType::Integer))
                .with_column(Column::new("client_name", DataType::Text)),
            Table::new("funds")
                .with_primary_key("fund_id")
                .with_default_filter("is_active = true")
                .with_column(Column::new("fund_id", DataType::Integer))
                .with_column(Column::new("fund_type", DataType::Text).dimension())
                .with_column(Column::new("total_aum", DataType::Decimal))
                .with_column(Column::new("is_active", DataType::Boolean)),
            Table::new("fee_transactions")
                .with_column(Column::new("client_id", DataType::Integer))
                .with_column(Column::new("fund_id", DataType::Integer))
                .with_column(Column::new("fee_amount", DataType::Decimal)),
            Table::new("fund_versions")
                .with_column(Column::new("fund_id", DataType::Integer))
                .with_column(Column::new("nav", DataType::Decimal))
                .with_column(
                    Column::new("effective_date", DataType::Date)
                        .with_temporal_role(TemporalRole::EffectiveDate),
                )
                .with_column(
                    Column::new("end_date", DataType::Date)
                        .with_temporal_role(TemporalRole::EndDate),
                ),
        ],
        relationships: vec![
            rel(("fee_transactions", "client_id"), ("clients", "client_id")),
            rel(("fee_transactions", "fund_id"), ("funds", "fund_id")),
            rel(("fund_versions", "fund_id"), ("funds", "fund_id")),
        ],
    })
    .unwrap()
}

fn metric(text: &str, table: &str, column: &str) -> ResolvedBinding {
    ResolvedBinding {
        entity_text: text.into(),
        kind: EntityKind::Metric,
        table: Some(table.into()),
        column: Some(column.into()),
        bound_values: vec![],
        confidence: 0.9,
        match_kind: MatchKind::Fuzzy,
        case_insensitive: false,
        warnings: vec![],
    }
}

fn dimension(text: &str, table: &str, column: &str, values: &[&str]) -> ResolvedBinding {
    ResolvedBinding {
        entity_text: text.into(),
        kind: EntityKind::DimensionValue,
        table: Some(table.into()),
        column: Some(column.into()),
        bound_values: values.iter().map(|v| v.to_string()).collect(),
        confidence: 0.9,
        match_kind: MatchKind::Exact,
        case_insensitive: false,
        warnings: vec![],
    }
}

fn generate(bindings: &[ResolvedBinding], intent: &Intent, dialect: Dialect) -> GeneratedQuery {
    let schema = schema();
    let plan = QueryPlanner::plan(bindings, &schema, intent, &PlannerCaps::default()).unwrap();
    SqlGenerator::new(dialect)
        .generate(&plan, bindings, intent, &schema)
        .unwrap()
}

#[test]
fn test_retrieval_gets_default_filter_and_safety_limit() {
    let bindings = vec![metric("aum", "funds", "total_aum")];
    let out = generate(&bindings, &Intent::default(), Dialect::Postgres);
    assert!(out.sql.contains("\"funds\".\"is_active\" = TRUE"));
    assert!(out.sql.ends_with("LIMIT 100"));
    assert_eq!(out.metadata.tables_used, vec!["funds".to_string()]);
}

#[test]
fn test_historical_scope_suppresses_default_filters() {
    let bindings = vec![metric("aum", "funds", "total_aum")];
    let mut intent = Intent::default();
    intent.time_scope = Some(TimeScope::Historical);
    let out = generate(&bindings, &intent, Dialect::Postgres);
    assert!(!out.sql.contains("is_active"));
}

#[test]
fn test_filter_only_question_selects_star() {
    let bindings = vec![dimension(
        "equity growth",
        "funds",
        "fund_type",
        &["Equity Growth"],
    )];
    let out = generate(&bindings, &Intent::default(), Dialect::Postgres);
    assert!(out.sql.contains("*"));
    assert!(out
        .sql
        .contains("\"funds\".\"fund_type\" = 'Equity Growth'"));
}

#[test]
fn test_single_unverified_value_compares_case_insensitively() {
    let mut binding = dimension("equity growth", "funds", "fund_type", &["equity growth"]);
    binding.case_insensitive = true;
    let out = generate(
        &[metric("aum", "funds", "total_aum"), binding],
        &Intent::default(),
        Dialect::Postgres,
    );
    assert!(out
        .sql
        .contains("UPPER(\"funds\".\"fund_type\") = UPPER('equity growth')"));
}

#[test]
fn test_multiple_unverified_values_use_uppercased_in_list() {
    let mut binding = dimension(
        "equity",
        "funds",
        "fund_type",
        &["equity growth", "equity value"],
    );
    binding.case_insensitive = true;
    let out = generate(
        &[metric("aum", "funds", "total_aum"), binding],
        &Intent::default(),
        Dialect::Postgres,
    );
    assert!(out
        .sql
        .contains("UPPER(\"funds\".\"fund_type\") IN ('EQUITY GROWTH', 'EQUITY VALUE')"));
}

#[test]
fn test_verified_multi_value_collapses_to_plain_in() {
    let out = generate(
        &[
            metric("aum", "funds", "total_aum"),
            dimension(
                "equity",
                "funds",
                "fund_type",
                &["Equity Growth", "Equity Value"],
            ),
        ],
        &Intent::default(),
        Dialect::Postgres,
    );
    assert!(out
        .sql
        .contains("\"funds\".\"fund_type\" IN ('Equity Growth', 'Equity Value')"));
}

#[test]
fn test_post_aggregation_filter_uses_cte_and_expands_shorthand() {
    // "clients with total fees over $1M, highest first"
    let bindings = vec![
        metric("total fees", "fee_transactions", "fee_amount"),
        metric("client name", "clients", "client_name"),
    ];
    let mut intent = Intent::new(IntentKind::Ranking);
    intent.filters = vec!["total fees paid > $1M".into()];
    let out = generate(&bindings, &intent, Dialect::Postgres);

    assert!(out.sql.starts_with("WITH \"aggregated\" AS ("));
    assert!(out
        .sql
        .contains("SUM(\"fee_transactions\".\"fee_amount\") AS \"total_fee_amount\""));
    assert!(out.sql.contains("GROUP BY \"clients\".\"client_name\""));
    assert!(out.sql.contains("\"total_fee_amount\" > 1000000"));
    assert!(out.sql.contains("ORDER BY \"total_fee_amount\" DESC"));
    assert!(out.sql.ends_with("LIMIT 10"));
}

#[test]
fn test_explicit_aggregation_hint_beats_the_sum_default() {
    let bindings = vec![
        metric("fees", "fee_transactions", "fee_amount"),
        metric("name", "clients", "client_name"),
    ];
    let mut intent = Intent::new(IntentKind::Aggregate);
    intent.aggregations = vec![Aggregation::Avg];
    let out = generate(&bindings, &intent, Dialect::Postgres);
    assert!(out
        .sql
        .contains("AVG(\"fee_transactions\".\"fee_amount\") AS \"avg_fee_amount\""));
    assert!(!out.sql.contains("SUM("));
}

#[test]
fn test_count_distinct_alias() {
    let bindings = vec![
        metric("fees", "fee_transactions", "fee_amount"),
        metric("name", "clients", "client_name"),
    ];
    let mut intent = Intent::new(IntentKind::Aggregate);
    intent.aggregations = vec![Aggregation::CountDistinct];
    let out = generate(&bindings, &intent, Dialect::Postgres);
    assert!(out
        .sql
        .contains("COUNT(DISTINCT \"fee_transactions\".\"fee_amount\") AS \"unique_fee_amount\""));
}

#[test]
fn test_comparison_orders_by_the_grouping_dimension() {
    let bindings = vec![
        metric("fees", "fee_transactions", "fee_amount"),
        metric("name", "clients", "client_name"),
    ];
    let intent = Intent::new(IntentKind::Comparison);
    let out = generate(&bindings, &intent, Dialect::Postgres);
    assert!(out.sql.contains("GROUP BY \"clients\".\"client_name\""));
    assert!(out
        .sql
        .contains("ORDER BY \"clients\".\"client_name\" ASC"));
    assert!(!out.sql.contains("LIMIT"));
}

#[test]
fn test_ranking_pulls_in_an_identifying_column() {
    let bindings = vec![metric("aum", "funds", "total_aum")];
    let mut intent = Intent::new(IntentKind::Ranking);
    intent.top_n = Some(3);
    let out = generate(&bindings, &intent, Dialect::Postgres);

    // funds has no label column; the primary key identifies the row.
    assert!(out.sql.contains("\"funds\".\"fund_id\""));
    assert!(out.sql.contains("SUM(\"funds\".\"total_aum\") AS \"total_total_aum\""));
    assert!(out.sql.contains("GROUP BY \"funds\".\"fund_id\""));
    assert!(out.sql.ends_with("LIMIT 3"));
}

#[test]
fn test_versioned_table_filters_to_current_rows() {
    let bindings = vec![metric("nav", "fund_versions", "nav")];
    let out = generate(&bindings, &Intent::default(), Dialect::Postgres);
    assert!(out.sql.contains("\"fund_versions\".\"end_date\" IS NULL"));
}

#[test]
fn test_as_of_scope_brackets_the_date() {
    let bindings = vec![metric("nav", "fund_versions", "nav")];
    let mut intent = Intent::default();
    intent.time_scope = Some(TimeScope::AsOf {
        date: "2024-03-31".into(),
    });
    let out = generate(&bindings, &intent, Dialect::Postgres);
    assert!(out
        .sql
        .contains("\"fund_versions\".\"effective_date\" <= '2024-03-31'"));
    assert!(out.sql.contains("\"fund_versions\".\"end_date\" > '2024-03-31'"));
}

#[test]
fn test_joined_tables_contribute_their_default_filters() {
    let bindings = vec![
        metric("fees", "fee_transactions", "fee_amount"),
        dimension("equity", "funds", "fund_type", &["Equity Growth"]),
    ];
    let out = generate(&bindings, &Intent::default(), Dialect::Postgres);
    assert!(out.sql.contains("JOIN \"funds\""));
    assert!(out.sql.contains("\"funds\".\"is_active\" = TRUE"));
}

#[test]
fn test_null_check_default_filter_is_table_qualified() {
    let schema = SchemaGraph::build(SchemaDef {
        tables: vec![Table::new("positions")
            .with_default_filter("end_date IS NULL")
            .with_default_filter("status IS NOT NULL")
            .with_column(Column::new("position_id", DataType::Integer))
            .with_column(Column::new("amount", DataType::Decimal))
            .with_column(Column::new("status", DataType::Text))
            .with_column(Column::new("end_date", DataType::Date))],
        relationships: vec![],
    })
    .unwrap();
    let bindings = vec![metric("amount", "positions", "amount")];
    let intent = Intent::default();
    let plan = QueryPlanner::plan(&bindings, &schema, &intent, &PlannerCaps::default()).unwrap();
    let out = SqlGenerator::new(Dialect::Postgres)
        .generate(&plan, &bindings, &intent, &schema)
        .unwrap();
    assert!(out.sql.contains("\"positions\".\"end_date\" IS NULL"));
    assert!(out.sql.contains("\"positions\".\"status\" IS NOT NULL"));
    // Never the bare, join-ambiguous form.
    assert!(!out.sql.contains(" end_date IS NULL"));
}

#[test]
fn test_text_comparison_against_numeric_column_is_dropped() {
    let bindings = vec![metric("fees", "fee_transactions", "fee_amount")];
    let mut intent = Intent::default();
    intent.filters = vec!["fees > lots".into()];
    let out = generate(&bindings, &intent, Dialect::Postgres);
    assert!(!out.sql.contains("lots"));
    assert!(out
        .metadata
        .warnings
        .iter()
        .any(|w| w.contains("against text; dropped")));
}

#[test]
fn test_unresolved_entity_degrades_with_warning() {
    let mut unresolved = metric("mystery metric", "funds", "total_aum");
    unresolved.kind = EntityKind::Column;
    unresolved.table = None;
    unresolved.column = None;
    unresolved.match_kind = MatchKind::Unresolved;

    let out = generate(
        &[metric("aum", "funds", "total_aum"), unresolved],
        &Intent::default(),
        Dialect::Postgres,
    );
    assert!(!out.sql.contains("mystery"));
    assert!(out
        .metadata
        .warnings
        .iter()
        .any(|w| w.contains("could not resolve 'mystery metric'")));
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    let bindings = vec![
        metric("total fees", "fee_transactions", "fee_amount"),
        metric("client name", "clients", "client_name"),
        dimension("equity", "funds", "fund_type", &["Equity Growth", "Equity Value"]),
    ];
    let mut intent = Intent::new(IntentKind::Ranking);
    intent.filters = vec!["total fees paid > $1M".into()];

    let first = generate(&bindings, &intent, Dialect::Postgres);
    for _ in 0..5 {
        assert_eq!(generate(&bindings, &intent, Dialect::Postgres).sql, first.sql);
    }
}

#[test]
fn test_every_dialect_renders_the_same_plan() {
    let bindings = vec![
        metric("aum", "funds", "total_aum"),
        dimension("equity", "funds", "fund_type", &["Equity Growth"]),
    ];
    for dialect in [Dialect::Ansi, Dialect::Postgres, Dialect::DuckDb] {
        let out = generate(&bindings, &Intent::default(), dialect);
        assert!(out.sql.contains("\"funds\".\"fund_type\" = 'Equity Growth'"));
        assert!(out.sql.contains("LIMIT 100"));
    }
}

#[test]
fn test_metadata_reflects_the_query_shape() {
    let bindings = vec![
        metric("fees", "fee_transactions", "fee_amount"),
        metric("name", "clients", "client_name"),
        dimension("equity", "funds", "fund_type", &["Equity Growth"]),
    ];
    let intent = Intent::new(IntentKind::Aggregate);
    let out = generate(&bindings, &intent, Dialect::Postgres);
    assert_eq!(out.metadata.join_count, 2);
    assert!(out.metadata.tables_used.contains(&"funds".to_string()));
    assert_eq!(
        out.metadata.aggregations_applied,
        vec!["SUM(fee_amount)".to_string()]
    );
}
