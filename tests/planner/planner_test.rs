//! Planner behavior over a realistic multi-table schema.

use sqlloom::error::CompileError;
use sqlloom::intent::{Aggregation, Intent, IntentKind};
use sqlloom::planner::{PlannerCaps, QueryPlan, QueryPlanner};
use sqlloom::resolve::{EntityKind, MatchKind, ResolvedBinding};
use sqlloom::schema::{Column, DataType, Relationship, SchemaDef, SchemaGraph, Table};

fn rel(from: (&str, &str), to: (&str, &str), optional: bool) -> Relationship {
    Relationship {
        from_table: from.0.into(),
        from_column: from.1.into(),
        to_table: to.0.into(),
        to_column: to.1.into(),
        optional,
    }
}

/// fee_transactions joins out to clients, funds, and (through funds)
/// fund_managers. regions is reachable only from clients.
fn schema() -> SchemaGraph {
    SchemaGraph::build(SchemaDef {
        tables: vec![
            Table::new("clients")
                .with_primary_key("client_id")
                .with_label_column("client_name")
                .with_column(Column::new("client_id", DataType::Integer))
                .with_column(Column::new("client_name", DataType::Text))
                .with_column(Column::new("region_id", DataType::Integer)),
            Table::new("regions")
                .with_primary_key("region_id")
                .with_column(Column::new("region_id", DataType::Integer))
                .with_column(Column::new("region_name", DataType::Text)),
            Table::new("funds")
                .with_primary_key("fund_id")
                .with_label_column("fund_name")
                .with_column(Column::new("fund_id", DataType::Integer))
                .with_column(Column::new("fund_name", DataType::Text))
                .with_column(Column::new("fund_type", DataType::Text).dimension())
                .with_column(Column::new("manager_id", DataType::Integer)),
            Table::new("fund_managers")
                .with_primary_key("manager_id")
                .with_column(Column::new("manager_id", DataType::Integer))
                .with_column(Column::new("manager_name", DataType::Text)),
            Table::new("fee_transactions")
                .with_column(Column::new("client_id", DataType::Integer))
                .with_column(Column::new("fund_id", DataType::Integer))
                .with_column(Column::new("fee_amount", DataType::Decimal)),
        ],
        relationships: vec![
            rel(("fee_transactions", "client_id"), ("clients", "client_id"), false),
            rel(("fee_transactions", "fund_id"), ("funds", "fund_id"), true),
            rel(("funds", "manager_id"), ("fund_managers", "manager_id"), false),
            rel(("clients", "region_id"), ("regions", "region_id"), false),
        ],
    })
    .unwrap()
}

fn metric(text: &str, table: &str, column: &str) -> ResolvedBinding {
    bound(text, table, column, EntityKind::Metric)
}

fn dimension(text: &str, table: &str, column: &str) -> ResolvedBinding {
    bound(text, table, column, EntityKind::DimensionValue)
}

fn bound(text: &str, table: &str, column: &str, kind: EntityKind) -> ResolvedBinding {
    ResolvedBinding {
        entity_text: text.into(),
        kind,
        table: Some(table.into()),
        column: Some(column.into()),
        bound_values: vec![],
        confidence: 0.9,
        match_kind: MatchKind::Fuzzy,
        case_insensitive: false,
        warnings: vec![],
    }
}

fn plan(bindings: &[ResolvedBinding]) -> Result<QueryPlan, CompileError> {
    QueryPlanner::plan(bindings, &schema(), &Intent::default(), &PlannerCaps::default())
}

#[test]
fn test_anchor_is_table_with_most_required_columns() {
    let p = plan(&[
        metric("fees", "fee_transactions", "fee_amount"),
        metric("client ref", "fee_transactions", "client_id"),
        metric("name", "clients", "client_name"),
    ])
    .unwrap();
    assert_eq!(p.base_table, "fee_transactions");
    assert_eq!(p.tables(), vec!["fee_transactions", "clients"]);
}

#[test]
fn test_anchor_tie_break_is_deterministic() {
    // One column per table. Both clients and funds are referenced, so the
    // lexically smallest wins.
    let a = plan(&[
        metric("name", "clients", "client_name"),
        dimension("equity", "funds", "fund_type"),
    ])
    .unwrap();
    let b = plan(&[
        dimension("equity", "funds", "fund_type"),
        metric("name", "clients", "client_name"),
    ])
    .unwrap();
    assert_eq!(a.base_table, "clients");
    assert_eq!(a.base_table, b.base_table);
    assert_eq!(a.join_path, b.join_path);
}

#[test]
fn test_filter_only_columns_are_marked() {
    let p = plan(&[
        metric("fees", "fee_transactions", "fee_amount"),
        dimension("equity", "funds", "fund_type"),
    ])
    .unwrap();
    let fee = p
        .required_columns
        .iter()
        .find(|c| c.column == "fee_amount")
        .unwrap();
    let fund_type = p
        .required_columns
        .iter()
        .find(|c| c.column == "fund_type")
        .unwrap();
    assert!(!fee.filter_only);
    assert!(fund_type.filter_only);
}

#[test]
fn test_unresolved_bindings_do_not_pull_in_tables() {
    let mut unresolved = metric("mystery", "funds", "total_aum");
    unresolved.table = None;
    unresolved.column = None;
    unresolved.match_kind = MatchKind::Unresolved;

    let p = plan(&[metric("fees", "fee_transactions", "fee_amount"), unresolved]).unwrap();
    assert_eq!(p.tables(), vec!["fee_transactions"]);
}

#[test]
fn test_intent_aggregations_become_plan_hints() {
    let mut intent = Intent::new(IntentKind::Aggregate);
    intent.aggregations = vec![Aggregation::Avg];
    let p = QueryPlanner::plan(
        &[metric("fees", "fee_transactions", "fee_amount")],
        &schema(),
        &intent,
        &PlannerCaps::default(),
    )
    .unwrap();
    assert_eq!(p.aggregation_hints, vec![Aggregation::Avg]);
}

#[test]
fn test_hop_budget_rejects_distant_tables() {
    let caps = PlannerCaps {
        max_hops: 1,
        max_tables: 5,
    };
    // fund_managers is two hops from fee_transactions.
    let err = QueryPlanner::plan(
        &[
            metric("fees", "fee_transactions", "fee_amount"),
            metric("manager", "fund_managers", "manager_name"),
        ],
        &schema(),
        &Intent::default(),
        &caps,
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::TooComplexJoin { .. }));
}

#[test]
fn test_table_budget_rejects_wide_plans() {
    let caps = PlannerCaps {
        max_hops: 3,
        max_tables: 3,
    };
    // regions + clients + fee_transactions + funds = 4 tables.
    let err = QueryPlanner::plan(
        &[
            metric("region", "regions", "region_name"),
            metric("fees", "fee_transactions", "fee_amount"),
            dimension("equity", "funds", "fund_type"),
        ],
        &schema(),
        &Intent::default(),
        &caps,
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::TooComplexJoin { max_tables: 3, .. }));
}

#[test]
fn test_base_table_label_is_free() {
    let mut p = plan(&[dimension("equity", "funds", "fund_type")]).unwrap();
    assert_eq!(p.base_table, "funds");
    QueryPlanner::add_label_column(&mut p, &schema(), &PlannerCaps::default());
    assert!(p
        .required_columns
        .iter()
        .any(|c| c.table == "funds" && c.column == "fund_name" && !c.filter_only));
    assert!(p.join_path.edges.is_empty());
}

#[test]
fn test_label_column_joins_nearest_labeled_table() {
    let mut p = plan(&[metric("fees", "fee_transactions", "fee_amount")]).unwrap();
    QueryPlanner::add_label_column(&mut p, &schema(), &PlannerCaps::default());
    // clients sorts before funds, both are one hop away.
    assert!(p
        .required_columns
        .iter()
        .any(|c| c.table == "clients" && c.column == "client_name"));
    assert_eq!(p.join_path.edges.len(), 1);
}

#[test]
fn test_label_column_never_fails_the_plan() {
    let caps = PlannerCaps {
        max_hops: 3,
        max_tables: 1,
    };
    let mut p = QueryPlanner::plan(
        &[metric("fees", "fee_transactions", "fee_amount")],
        &schema(),
        &Intent::default(),
        &caps,
    )
    .unwrap();
    let before = p.clone();
    QueryPlanner::add_label_column(&mut p, &schema(), &caps);
    assert_eq!(p, before);
}

#[test]
fn test_duplicate_entity_columns_are_kept_per_entity() {
    let p = plan(&[
        metric("total fees", "fee_transactions", "fee_amount"),
        metric("fees paid", "fee_transactions", "fee_amount"),
    ])
    .unwrap();
    // Deduplication is the generator's concern; the plan records demand.
    assert_eq!(p.required_columns.len(), 2);
}
