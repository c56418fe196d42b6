//! Entity resolution: multi-source merge behavior end to end.

use sqlloom::catalog::{DimensionValue, ValueSet};
use sqlloom::resolve::{
    Candidate, CandidateSource, Entity, EntityKind, EntityResolver, MatchKind, ResolveContext,
};
use sqlloom::schema::{Column, DataType, SchemaDef, SchemaGraph, Table};

fn schema() -> SchemaGraph {
    SchemaGraph::build(SchemaDef {
        tables: vec![
            Table::new("funds")
                .with_primary_key("fund_id")
                .with_column(Column::new("fund_id", DataType::Integer))
                .with_column(Column::new("fund_type", DataType::Text).dimension())
                .with_column(Column::new("total_aum", DataType::Decimal)),
            Table::new("clients")
                .with_primary_key("client_id")
                .with_column(Column::new("client_id", DataType::Integer))
                .with_column(Column::new("client_name", DataType::Text)),
        ],
        relationships: vec![],
    })
    .unwrap()
}

fn fund_types() -> ValueSet {
    ValueSet::analyze(vec![
        DimensionValue {
            value: "Equity Growth".into(),
            count: 10,
        },
        DimensionValue {
            value: "Equity Value".into(),
            count: 8,
        },
        DimensionValue {
            value: "Bond Income".into(),
            count: 5,
        },
    ])
}

fn value_candidate(value: &str, score: f64, source: CandidateSource) -> Candidate {
    Candidate {
        canonical_name: value.into(),
        table: Some("funds".into()),
        column: Some("fund_type".into()),
        value: Some(value.into()),
        score,
        source,
    }
}

#[test]
fn test_local_mapping_beats_higher_scoring_semantic() {
    let schema = schema();
    let ctx = ResolveContext::new(&schema);
    let entity = Entity::new("assets", EntityKind::Metric)
        .with_candidate(Candidate {
            canonical_name: "client_name".into(),
            table: Some("clients".into()),
            column: Some("client_name".into()),
            value: None,
            score: 0.99,
            source: CandidateSource::Semantic,
        })
        .with_candidate(Candidate {
            canonical_name: "total_aum".into(),
            table: Some("funds".into()),
            column: Some("total_aum".into()),
            value: None,
            score: 0.5,
            source: CandidateSource::Local,
        });

    let binding = EntityResolver::resolve(&entity, &ctx);
    assert_eq!(binding.column.as_deref(), Some("total_aum"));
    assert_eq!(binding.confidence, 1.0);
    assert_eq!(binding.match_kind, MatchKind::Exact);
}

#[test]
fn test_multi_value_in_list_retention() {
    // The documented behavior: "equity funds" binds to every fund type
    // that is semantically equity, not just the top scorer.
    let schema = schema();
    let set = fund_types();
    let ctx = ResolveContext::new(&schema).with_dimension("funds", "fund_type", &set);
    let entity = Entity::new("equity funds", EntityKind::DimensionValue)
        .with_candidate(value_candidate("Equity Growth", 0.9, CandidateSource::Semantic))
        .with_candidate(value_candidate("Equity Value", 0.85, CandidateSource::Semantic))
        .with_candidate(value_candidate("Bond Income", 0.1, CandidateSource::Semantic));

    let binding = EntityResolver::resolve(&entity, &ctx);
    assert_eq!(
        binding.bound_values,
        vec!["Equity Growth".to_string(), "Equity Value".to_string()]
    );
    assert_eq!(binding.table.as_deref(), Some("funds"));
    assert_eq!(binding.column.as_deref(), Some("fund_type"));
}

#[test]
fn test_duplicate_values_across_sources_deduplicate() {
    let schema = schema();
    let set = fund_types();
    let ctx = ResolveContext::new(&schema).with_dimension("funds", "fund_type", &set);
    let entity = Entity::new("growth", EntityKind::DimensionValue)
        .with_candidate(value_candidate("Equity Growth", 0.9, CandidateSource::Semantic))
        .with_candidate(value_candidate("equity growth", 0.7, CandidateSource::Llm));

    let binding = EntityResolver::resolve(&entity, &ctx);
    // The LLM's lowercase variant maps onto the same verified value.
    assert_eq!(binding.bound_values, vec!["Equity Growth".to_string()]);
    assert!(!binding.case_insensitive);
}

#[test]
fn test_per_kind_thresholds() {
    let schema = schema();
    let ctx = ResolveContext::new(&schema);

    // 0.35 passes the schema threshold (0.3)...
    let entity = Entity::new("type", EntityKind::Column).with_candidate(Candidate {
        canonical_name: "fund_type".into(),
        table: Some("funds".into()),
        column: Some("fund_type".into()),
        value: None,
        score: 0.35,
        source: CandidateSource::Semantic,
    });
    assert!(EntityResolver::resolve(&entity, &ctx).is_resolved());

    // ...but not the business-context threshold (0.4).
    let entity = Entity::new("house view", EntityKind::FilterExpression).with_candidate(Candidate {
        canonical_name: "fund_type".into(),
        table: Some("funds".into()),
        column: Some("fund_type".into()),
        value: Some("Equity Growth".into()),
        score: 0.35,
        source: CandidateSource::Semantic,
    });
    assert!(!EntityResolver::resolve(&entity, &ctx).is_resolved());
}

#[test]
fn test_zero_survivors_is_unresolved_not_fabricated() {
    let schema = schema();
    let ctx = ResolveContext::new(&schema);
    let entity = Entity::new("galactic credits", EntityKind::DimensionValue)
        .with_candidate(value_candidate("Bond Income", 0.05, CandidateSource::Llm));

    let binding = EntityResolver::resolve(&entity, &ctx);
    assert_eq!(binding.match_kind, MatchKind::Unresolved);
    assert!(binding.bound_values.is_empty());
    assert!(!binding
        .bound_values
        .contains(&"galactic credits".to_string()));
}

#[test]
fn test_ambiguity_ceiling_warns_but_returns_everything() {
    let schema = schema();
    let mut ctx = ResolveContext::new(&schema);
    ctx.ambiguity_ceiling = 3;

    let mut entity = Entity::new("any fund", EntityKind::DimensionValue);
    for i in 0..5 {
        entity = entity.with_candidate(value_candidate(
            &format!("Type {}", i),
            0.5,
            CandidateSource::Semantic,
        ));
    }

    let binding = EntityResolver::resolve(&entity, &ctx);
    assert_eq!(binding.bound_values.len(), 5);
    assert!(binding.warnings.iter().any(|w| w.contains("too broad")));
}

#[test]
fn test_table_entity_resolves_by_name_inflection() {
    let schema = schema();
    let ctx = ResolveContext::new(&schema);
    for text in ["funds", "fund", "Funds"] {
        let binding = EntityResolver::resolve(&Entity::new(text, EntityKind::Table), &ctx);
        assert_eq!(binding.table.as_deref(), Some("funds"), "text: {}", text);
    }
}

#[test]
fn test_column_entity_resolves_via_schema_scan() {
    let schema = schema();
    let ctx = ResolveContext::new(&schema);
    let binding =
        EntityResolver::resolve(&Entity::new("total aum", EntityKind::Metric), &ctx);
    assert_eq!(binding.table.as_deref(), Some("funds"));
    assert_eq!(binding.column.as_deref(), Some("total_aum"));
    assert_eq!(binding.match_kind, MatchKind::Exact);
}

#[test]
fn test_prefix_category_resolution() {
    let schema = schema();
    let set = fund_types();
    let ctx = ResolveContext::new(&schema).with_dimension("funds", "fund_type", &set);
    let binding =
        EntityResolver::resolve(&Entity::new("equity", EntityKind::DimensionValue), &ctx);
    assert_eq!(binding.match_kind, MatchKind::PrefixCategory);
    assert_eq!(binding.bound_values.len(), 2);
}
