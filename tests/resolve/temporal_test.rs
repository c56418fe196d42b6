//! Row-currency predicates for versioned tables under each time scope.

use sqlloom::intent::TimeScope;
use sqlloom::resolve::{temporal_predicate, TemporalColumns};
use sqlloom::schema::{Column, DataType, Table, TemporalRole, VersionRole};
use sqlloom::sql::expr::Expr;
use sqlloom::sql::Dialect;

fn sql(expr: Expr) -> String {
    expr.to_tokens_for_dialect(Dialect::Postgres)
        .serialize(Dialect::Postgres)
}

fn versioned() -> TemporalColumns {
    TemporalColumns::from_table(
        &Table::new("fund_versions")
            .with_column(Column::new("fund_id", DataType::Integer))
            .with_column(
                Column::new("effective_date", DataType::Date)
                    .with_temporal_role(TemporalRole::EffectiveDate),
            )
            .with_column(
                Column::new("end_date", DataType::Date)
                    .with_temporal_role(TemporalRole::EndDate),
            ),
    )
}

#[test]
fn test_current_scope_keeps_open_ended_rows() {
    let mut warnings = vec![];
    let expr =
        temporal_predicate("fund_versions", &versioned(), &TimeScope::Current, &mut warnings)
            .unwrap();
    assert_eq!(sql(expr), "\"fund_versions\".\"end_date\" IS NULL");
}

#[test]
fn test_end_date_takes_precedence_over_latest_flag() {
    let cols = TemporalColumns::from_table(
        &Table::new("holdings")
            .with_column(
                Column::new("end_date", DataType::Date)
                    .with_temporal_role(TemporalRole::EndDate),
            )
            .with_column(
                Column::new("is_latest", DataType::Boolean)
                    .with_version_role(VersionRole::LatestFlag),
            ),
    );
    let mut warnings = vec![];
    let expr = temporal_predicate("holdings", &cols, &TimeScope::Current, &mut warnings).unwrap();
    assert_eq!(sql(expr), "\"holdings\".\"end_date\" IS NULL");
}

#[test]
fn test_as_of_brackets_the_date() {
    let mut warnings = vec![];
    let scope = TimeScope::AsOf {
        date: "2023-12-31".into(),
    };
    let expr = temporal_predicate("fund_versions", &versioned(), &scope, &mut warnings).unwrap();
    assert_eq!(
        sql(expr),
        "\"fund_versions\".\"effective_date\" <= '2023-12-31' AND \
         (\"fund_versions\".\"end_date\" IS NULL OR \"fund_versions\".\"end_date\" > '2023-12-31')"
    );
    assert!(warnings.is_empty());
}

#[test]
fn test_as_of_with_effective_date_only() {
    let cols = TemporalColumns::from_table(&Table::new("prices").with_column(
        Column::new("effective_date", DataType::Date)
            .with_temporal_role(TemporalRole::EffectiveDate),
    ));
    let mut warnings = vec![];
    let scope = TimeScope::AsOf {
        date: "2023-12-31".into(),
    };
    let expr = temporal_predicate("prices", &cols, &scope, &mut warnings).unwrap();
    assert_eq!(sql(expr), "\"prices\".\"effective_date\" <= '2023-12-31'");
}

#[test]
fn test_range_scope_bounds_effective_date() {
    let mut warnings = vec![];
    let scope = TimeScope::Range {
        from: "2024-01-01".into(),
        to: "2024-06-30".into(),
    };
    let expr = temporal_predicate("fund_versions", &versioned(), &scope, &mut warnings).unwrap();
    assert_eq!(
        sql(expr),
        "\"fund_versions\".\"effective_date\" BETWEEN '2024-01-01' AND '2024-06-30'"
    );
}

#[test]
fn test_malformed_range_degrades_to_current_with_warning() {
    let mut warnings = vec![];
    let scope = TimeScope::Range {
        from: "Q1".into(),
        to: "2024-06-30".into(),
    };
    let expr = temporal_predicate("fund_versions", &versioned(), &scope, &mut warnings).unwrap();
    assert_eq!(sql(expr), "\"fund_versions\".\"end_date\" IS NULL");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Q1"));
}

#[test]
fn test_historical_scope_emits_nothing() {
    let mut warnings = vec![];
    assert!(temporal_predicate(
        "fund_versions",
        &versioned(),
        &TimeScope::Historical,
        &mut warnings
    )
    .is_none());
    assert!(warnings.is_empty());
}

#[test]
fn test_plain_table_is_untouched() {
    let cols = TemporalColumns::from_table(
        &Table::new("clients").with_column(Column::new("client_id", DataType::Integer)),
    );
    assert!(!cols.is_temporal());
    let mut warnings = vec![];
    assert!(temporal_predicate("clients", &cols, &TimeScope::Current, &mut warnings).is_none());
}
