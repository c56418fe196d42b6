//! Schema graph construction and join-path search.

use sqlloom::error::CompileError;
use sqlloom::schema::{Column, DataType, PathError, Relationship, SchemaDef, SchemaGraph, Table};

fn rel(from: (&str, &str), to: (&str, &str)) -> Relationship {
    Relationship {
        from_table: from.0.into(),
        from_column: from.1.into(),
        to_table: to.0.into(),
        to_column: to.1.into(),
        optional: false,
    }
}

/// clients <- fee_transactions -> funds -> fund_managers
fn chain_schema() -> SchemaGraph {
    SchemaGraph::build(SchemaDef {
        tables: vec![
            Table::new("clients")
                .with_primary_key("client_id")
                .with_column(Column::new("client_id", DataType::Integer)),
            Table::new("fee_transactions")
                .with_column(Column::new("client_id", DataType::Integer))
                .with_column(Column::new("fund_id", DataType::Integer)),
            Table::new("funds")
                .with_primary_key("fund_id")
                .with_column(Column::new("fund_id", DataType::Integer))
                .with_column(Column::new("manager_id", DataType::Integer)),
            Table::new("fund_managers")
                .with_primary_key("manager_id")
                .with_column(Column::new("manager_id", DataType::Integer)),
            Table::new("orphans")
                .with_column(Column::new("id", DataType::Integer)),
        ],
        relationships: vec![
            rel(("fee_transactions", "client_id"), ("clients", "client_id")),
            rel(("fee_transactions", "fund_id"), ("funds", "fund_id")),
            rel(("funds", "manager_id"), ("fund_managers", "manager_id")),
        ],
    })
    .unwrap()
}

#[test]
fn test_find_path_shortest() {
    let schema = chain_schema();
    let path = schema.find_path("clients", "funds", 3).unwrap();
    assert_eq!(path.edges.len(), 2);
    assert_eq!(path.tables(), vec!["clients", "fee_transactions", "funds"]);
}

#[test]
fn test_path_edges_are_oriented_along_the_walk() {
    let schema = chain_schema();
    let path = schema.find_path("clients", "fee_transactions", 3).unwrap();
    assert_eq!(path.edges[0].from_table, "clients");
    assert_eq!(path.edges[0].to_table, "fee_transactions");
}

#[test]
fn test_hop_budget_rejects_long_paths() {
    let schema = chain_schema();
    // clients -> fund_managers needs 3 hops
    assert!(schema.find_path("clients", "fund_managers", 3).is_ok());
    assert!(matches!(
        schema.find_path("clients", "fund_managers", 2),
        Err(PathError::TooComplex { .. })
    ));
}

#[test]
fn test_disconnected_table_has_no_path() {
    let schema = chain_schema();
    assert!(matches!(
        schema.find_path("clients", "orphans", 5),
        Err(PathError::NoPath { .. })
    ));
}

#[test]
fn test_unknown_table_is_distinct_from_no_path() {
    let schema = chain_schema();
    assert!(matches!(
        schema.find_path("clients", "nonexistent", 5),
        Err(PathError::UnknownTable(_))
    ));
}

#[test]
fn test_join_tree_reuses_shared_edges() {
    let schema = chain_schema();
    // clients and funds both route through fee_transactions; the shared
    // edge must appear once.
    let tree = schema
        .find_join_tree("fee_transactions", &["clients", "funds"], 3, 5)
        .unwrap();
    assert_eq!(tree.edges.len(), 2);
    let mut tables = tree.tables();
    tables.sort_unstable();
    assert_eq!(tables, vec!["clients", "fee_transactions", "funds"]);
}

#[test]
fn test_join_tree_table_budget() {
    let schema = chain_schema();
    let err = schema
        .find_join_tree("clients", &["fund_managers"], 3, 3)
        .unwrap_err();
    assert!(matches!(err, PathError::TooComplex { max_tables: 3, .. }));
}

#[test]
fn test_join_tree_is_deterministic_across_target_order() {
    let schema = chain_schema();
    let a = schema
        .find_join_tree("fee_transactions", &["funds", "clients"], 3, 5)
        .unwrap();
    let b = schema
        .find_join_tree("fee_transactions", &["clients", "funds"], 3, 5)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_build_rejects_duplicate_tables() {
    let def = SchemaDef {
        tables: vec![Table::new("funds"), Table::new("funds")],
        relationships: vec![],
    };
    assert!(matches!(
        SchemaGraph::build(def),
        Err(CompileError::InvalidSchema(_))
    ));
}

#[test]
fn test_build_rejects_edges_to_missing_tables() {
    let def = SchemaDef {
        tables: vec![Table::new("funds").with_column(Column::new("fund_id", DataType::Integer))],
        relationships: vec![rel(("funds", "fund_id"), ("missing", "id"))],
    };
    assert!(SchemaGraph::build(def).is_err());
}

#[test]
fn test_from_json() {
    let json = r#"{
        "tables": [
            {"name": "funds", "columns": [
                {"name": "fund_id", "data_type": "integer"},
                {"name": "fund_type", "data_type": "text", "is_dimension": true}
            ], "primary_key": "fund_id"}
        ],
        "relationships": []
    }"#;
    let schema = SchemaGraph::from_json(json).unwrap();
    assert!(schema.has_table("funds"));
    let table = schema.table("funds").unwrap();
    assert!(table.column("fund_type").unwrap().is_dimension);
}
