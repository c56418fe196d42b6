//! Injection safety: hostile values end up as escaped literals or are
//! dropped, never as live SQL.

use sqlloom::intent::Intent;
use sqlloom::planner::{PlannerCaps, QueryPlanner};
use sqlloom::resolve::{EntityKind, MatchKind, ResolvedBinding};
use sqlloom::schema::{Column, DataType, SchemaDef, SchemaGraph, Table};
use sqlloom::sql::expr::{col, lit_str, ExprExt};
use sqlloom::sql::generate::GeneratedQuery;
use sqlloom::sql::numeric::parse_number;
use sqlloom::sql::{Dialect, SqlGenerator};

fn schema() -> SchemaGraph {
    SchemaGraph::build(SchemaDef {
        tables: vec![Table::new("clients")
            .with_primary_key("client_id")
            .with_column(Column::new("client_id", DataType::Integer))
            .with_column(Column::new("client_name", DataType::Text).dimension())
            .with_column(Column::new("balance", DataType::Decimal))],
        relationships: vec![],
    })
    .unwrap()
}

fn value_binding(text: &str, values: &[&str]) -> ResolvedBinding {
    ResolvedBinding {
        entity_text: text.into(),
        kind: EntityKind::DimensionValue,
        table: Some("clients".into()),
        column: Some("client_name".into()),
        bound_values: values.iter().map(|v| v.to_string()).collect(),
        confidence: 0.9,
        match_kind: MatchKind::Exact,
        case_insensitive: false,
        warnings: vec![],
    }
}

fn generate(bindings: &[ResolvedBinding], intent: &Intent) -> GeneratedQuery {
    let schema = schema();
    let plan = QueryPlanner::plan(bindings, &schema, intent, &PlannerCaps::default()).unwrap();
    SqlGenerator::new(Dialect::Postgres)
        .generate(&plan, bindings, intent, &schema)
        .unwrap()
}

#[test]
fn test_single_quotes_are_doubled() {
    let out = generate(&[value_binding("obrien", &["O'Brien"])], &Intent::default());
    assert!(out.sql.contains("'O''Brien'"));
    // The raw, unescaped literal must not appear anywhere.
    assert!(!out.sql.contains("'O'Brien'"));
}

#[test]
fn test_drop_table_payload_stays_inside_the_literal() {
    let payload = "x'; DROP TABLE clients; --";
    let out = generate(&[value_binding("x", &[payload])], &Intent::default());
    // Escaped form: the embedded quote is doubled, so the statement never
    // leaves the string literal.
    assert!(out.sql.contains("'x''; DROP TABLE clients; --'"));
    assert!(!out.sql.contains("'x';"));
}

#[test]
fn test_hostile_values_in_an_in_list() {
    let out = generate(
        &[value_binding(
            "names",
            &["Alice", "Bob'); DELETE FROM clients; --"],
        )],
        &Intent::default(),
    );
    assert!(out
        .sql
        .contains("IN ('Alice', 'Bob''); DELETE FROM clients; --')"));
}

#[test]
fn test_case_insensitive_predicate_escapes_too() {
    let mut binding = value_binding("obrien", &["o'brien"]);
    binding.case_insensitive = true;
    let out = generate(&[binding], &Intent::default());
    assert!(out.sql.contains("UPPER('o''brien')"));
}

#[test]
fn test_unparsable_filter_text_never_reaches_the_sql() {
    let mut intent = Intent::default();
    intent.filters = vec!["balance > 100; DROP TABLE clients".into()];
    let out = generate(&[value_binding("alice", &["Alice"])], &intent);
    // The RHS fails numeric and quoted-string parsing as a comparison
    // value, so it survives only as an escaped string literal or not at
    // all; the DROP must not be executable.
    assert!(!out.sql.contains("DROP TABLE clients;"));
    if out.sql.contains("DROP") {
        assert!(out.sql.contains("'100; DROP TABLE clients'"));
    }
}

#[test]
fn test_shorthand_parser_rejects_trailing_statements() {
    assert_eq!(parse_number("100; DROP TABLE clients"), None);
    assert_eq!(parse_number("1M; --"), None);
}

#[test]
fn test_huge_numeric_filter_is_dropped_not_fatal() {
    // A digit string past f64's range must not reach the serializer as
    // an infinite literal; it is dropped like any unparsable filter.
    let huge = "9".repeat(400);
    assert_eq!(parse_number(&huge), None);

    let mut intent = Intent::default();
    intent.filters = vec![format!("balance > {}", huge)];
    let out = generate(&[value_binding("alice", &["Alice"])], &intent);
    assert!(!out.sql.contains(&huge));
    assert!(out.metadata.warnings.iter().any(|w| w.contains("dropped")));
}

#[test]
fn test_identifier_quotes_are_doubled() {
    let sql = col("bad\"col")
        .eq(lit_str("v"))
        .to_tokens_for_dialect(Dialect::Postgres)
        .serialize(Dialect::Postgres);
    assert_eq!(sql, "\"bad\"\"col\" = 'v'");
}

#[test]
fn test_entity_text_is_never_interpolated() {
    let mut unresolved = value_binding("Robert'); DROP TABLE clients;--", &[]);
    unresolved.match_kind = MatchKind::Unresolved;
    unresolved.table = None;
    unresolved.column = None;

    let out = generate(
        &[value_binding("alice", &["Alice"]), unresolved],
        &Intent::default(),
    );
    assert!(!out.sql.contains("Robert"));
    assert!(out
        .metadata
        .warnings
        .iter()
        .any(|w| w.contains("could not resolve")));
}

#[test]
fn test_every_dialect_escapes_the_same_way() {
    for dialect in [Dialect::Ansi, Dialect::Postgres, Dialect::DuckDb] {
        let sql = col("client_name")
            .eq(lit_str("O'Brien"))
            .to_tokens_for_dialect(dialect)
            .serialize(dialect);
        assert_eq!(sql, "\"client_name\" = 'O''Brien'");
    }
}
