//! The multi-source confidence merge.
//!
//! Candidates arrive from three ranked sources: operator-curated local
//! mappings, semantic-similarity search, and LLM extraction. Local wins
//! outright; the rest pass through a per-kind score threshold. The
//! threshold is a quality filter, not a top-K cutoff: an entity may
//! legitimately resolve to zero, one, or many candidates.

use std::cmp::Ordering;

use inflector::Inflector as _;

use crate::catalog::ValueSet;
use crate::schema::SchemaGraph;

use super::{Candidate, CandidateSource, Entity, EntityKind, MatchKind, ResolvedBinding};

/// Per-resolution context: the schema, tuning knobs, and (for dimension
/// value entities) the discovered value set of the target column.
pub struct ResolveContext<'a> {
    pub schema: &'a SchemaGraph,
    /// Acceptance threshold for schema and dimension-value matches.
    pub schema_threshold: f64,
    /// Acceptance threshold for business-context matches (metrics,
    /// free-form filter expressions).
    pub business_threshold: f64,
    /// Surviving-candidate count above which a "too broad" warning is
    /// attached. Never truncates.
    pub ambiguity_ceiling: usize,
    /// The (table, column) the value set below belongs to.
    pub dimension: Option<(&'a str, &'a str)>,
    pub value_set: Option<&'a ValueSet>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(schema: &'a SchemaGraph) -> Self {
        Self {
            schema,
            schema_threshold: 0.3,
            business_threshold: 0.4,
            ambiguity_ceiling: 20,
            dimension: None,
            value_set: None,
        }
    }

    pub fn with_dimension(mut self, table: &'a str, column: &'a str, set: &'a ValueSet) -> Self {
        self.dimension = Some((table, column));
        self.value_set = Some(set);
        self
    }

    fn threshold_for(&self, kind: EntityKind) -> f64 {
        match kind {
            EntityKind::Metric | EntityKind::FilterExpression => self.business_threshold,
            _ => self.schema_threshold,
        }
    }
}

/// Stateless merge engine. All context travels in [`ResolveContext`].
pub struct EntityResolver;

impl EntityResolver {
    /// Resolve one entity to a binding.
    ///
    /// A bound value is only ever a curated mapping, a verified schema
    /// name, or a candidate the sources produced. Raw user text never
    /// becomes a bound value on its own: that would produce syntactically
    /// valid but semantically wrong SQL.
    pub fn resolve(entity: &Entity, ctx: &ResolveContext) -> ResolvedBinding {
        if let Some(local) = entity
            .candidates
            .iter()
            .find(|c| c.source == CandidateSource::Local)
        {
            return Self::from_local(entity, local);
        }

        let threshold = ctx.threshold_for(entity.kind);
        let mut survivors: Vec<&Candidate> = entity
            .candidates
            .iter()
            .filter(|c| c.source != CandidateSource::Local && c.score >= threshold)
            .collect();
        survivors.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.canonical_name.cmp(&b.canonical_name))
        });

        if survivors.is_empty() {
            if let Some(binding) = Self::schema_lookup(entity, ctx) {
                return binding;
            }
            if entity.kind == EntityKind::DimensionValue {
                if let Some(binding) = Self::pattern_category(entity, ctx) {
                    return binding;
                }
            }
            return ResolvedBinding::unresolved(entity);
        }

        match entity.kind {
            EntityKind::DimensionValue => Self::bind_values(entity, &survivors, ctx),
            _ => Self::bind_structural(entity, &survivors, ctx),
        }
    }

    fn from_local(entity: &Entity, local: &Candidate) -> ResolvedBinding {
        ResolvedBinding {
            entity_text: entity.text.clone(),
            kind: entity.kind,
            table: local.table.clone(),
            column: local.column.clone(),
            bound_values: local.value.iter().cloned().collect(),
            confidence: 1.0,
            match_kind: MatchKind::Exact,
            case_insensitive: false,
            warnings: vec![],
        }
    }

    /// Bind a table/column/metric entity to its single best candidate.
    /// Ties on score break lexically for determinism.
    fn bind_structural(
        entity: &Entity,
        survivors: &[&Candidate],
        ctx: &ResolveContext,
    ) -> ResolvedBinding {
        let best = survivors[0];
        let mut warnings = vec![];
        if survivors.len() > ctx.ambiguity_ceiling {
            warnings.push(format!(
                "'{}' matched {} candidates; the query may be too broad",
                entity.text,
                survivors.len()
            ));
        }
        ResolvedBinding {
            entity_text: entity.text.clone(),
            kind: entity.kind,
            table: best.table.clone(),
            column: best.column.clone(),
            bound_values: vec![],
            confidence: best.score,
            match_kind: MatchKind::Fuzzy,
            case_insensitive: false,
            warnings,
        }
    }

    /// Bind a dimension-value entity, keeping every distinct database
    /// value that passed the threshold. Multi-match becomes an IN-list
    /// downstream; collapsing to the top scorer here would silently drop
    /// rows the user asked for.
    fn bind_values(
        entity: &Entity,
        survivors: &[&Candidate],
        ctx: &ResolveContext,
    ) -> ResolvedBinding {
        let verified_set = ctx.value_set.filter(|s| !s.implicit);

        let mut values: Vec<String> = vec![];
        let mut all_verified = true;
        for c in survivors {
            let Some(v) = &c.value else { continue };
            let bound = match verified_set
                .and_then(|set| set.values.iter().find(|dv| dv.value.eq_ignore_ascii_case(v)))
            {
                Some(dv) => dv.value.clone(),
                None => {
                    all_verified = false;
                    v.clone()
                }
            };
            if !values.contains(&bound) {
                values.push(bound);
            }
        }

        if values.is_empty() {
            if let Some(binding) = Self::pattern_category(entity, ctx) {
                return binding;
            }
            return ResolvedBinding::unresolved(entity);
        }
        values.sort_unstable();

        let mut warnings = vec![];
        if values.len() > 1 {
            warnings.push(format!(
                "interpreted '{}' as {} values",
                entity.text,
                values.len()
            ));
        }
        if values.len() > ctx.ambiguity_ceiling {
            warnings.push(format!(
                "'{}' matched {} values; the query may be too broad",
                entity.text,
                values.len()
            ));
        }

        let best = survivors
            .iter()
            .map(|c| c.score)
            .fold(0.0_f64, f64::max);
        let exact = values.len() == 1
            && all_verified
            && values[0].eq_ignore_ascii_case(entity.text.trim());

        let (table, column) = Self::dimension_target(survivors, ctx);

        ResolvedBinding {
            entity_text: entity.text.clone(),
            kind: entity.kind,
            table,
            column,
            bound_values: values,
            confidence: best,
            match_kind: if exact { MatchKind::Exact } else { MatchKind::Fuzzy },
            case_insensitive: !all_verified,
            warnings,
        }
    }

    /// Target column for a value binding: the context's dimension if set,
    /// otherwise whatever the best candidate names.
    fn dimension_target(
        survivors: &[&Candidate],
        ctx: &ResolveContext,
    ) -> (Option<String>, Option<String>) {
        if let Some((table, column)) = ctx.dimension {
            return (Some(table.to_string()), Some(column.to_string()));
        }
        survivors
            .iter()
            .find(|c| c.table.is_some() && c.column.is_some())
            .map(|c| (c.table.clone(), c.column.clone()))
            .unwrap_or((None, None))
    }

    /// Direct schema-name lookup for structural entities whose candidates
    /// all fell below threshold. "fund" vs "funds" vs "Fund Name" are the
    /// same name to the schema; a verified hit counts as an exact match,
    /// not a fabrication.
    fn schema_lookup(entity: &Entity, ctx: &ResolveContext) -> Option<ResolvedBinding> {
        if !matches!(
            entity.kind,
            EntityKind::Table | EntityKind::Column | EntityKind::Metric
        ) {
            return None;
        }

        let variants = name_variants(&entity.text);

        if entity.kind == EntityKind::Table {
            let name = variants.iter().find(|v| ctx.schema.has_table(v))?;
            return Some(ResolvedBinding {
                entity_text: entity.text.clone(),
                kind: entity.kind,
                table: Some(name.clone()),
                column: None,
                bound_values: vec![],
                confidence: 1.0,
                match_kind: MatchKind::Exact,
                case_insensitive: false,
                warnings: vec![],
            });
        }

        // table_names() is sorted, so a column present in several tables
        // resolves the same way every time.
        let mut hits: Vec<(String, String)> = vec![];
        for table_name in ctx.schema.table_names() {
            let Some(table) = ctx.schema.table(table_name) else {
                continue;
            };
            for variant in &variants {
                if table.column(variant).is_some() {
                    hits.push((table_name.to_string(), variant.clone()));
                    break;
                }
            }
        }
        let (table, column) = hits.first()?.clone();
        let mut warnings = vec![];
        if hits.len() > 1 {
            warnings.push(format!(
                "column '{}' exists in {} tables; using '{}'",
                column,
                hits.len(),
                table
            ));
        }
        Some(ResolvedBinding {
            entity_text: entity.text.clone(),
            kind: entity.kind,
            table: Some(table),
            column: Some(column),
            bound_values: vec![],
            confidence: 1.0,
            match_kind: MatchKind::Exact,
            case_insensitive: false,
            warnings,
        })
    }

    /// Category binding through a detected value pattern: "equity" against
    /// a value set with prefix pattern "Equity " binds every matching
    /// value. The bound values are real database values, so the resulting
    /// IN-list compares exactly.
    fn pattern_category(entity: &Entity, ctx: &ResolveContext) -> Option<ResolvedBinding> {
        let set = ctx.value_set.filter(|s| !s.implicit)?;
        let text = entity.text.trim();

        let pattern = set.patterns.iter().find(|p| {
            let stem = p.pattern.trim();
            !stem.is_empty() && stem.eq_ignore_ascii_case(text)
        })?;
        if pattern.matching_values.is_empty() {
            return None;
        }

        let mut values = pattern.matching_values.clone();
        values.sort_unstable();
        values.dedup();

        let (table, column) = ctx.dimension?;
        Some(ResolvedBinding {
            entity_text: entity.text.clone(),
            kind: entity.kind,
            table: Some(table.to_string()),
            column: Some(column.to_string()),
            confidence: 0.8,
            match_kind: MatchKind::PrefixCategory,
            case_insensitive: false,
            warnings: vec![format!(
                "interpreted '{}' as {} values",
                entity.text,
                values.len()
            )],
            bound_values: values,
        })
    }
}

fn name_variants(text: &str) -> Vec<String> {
    let snake = text.trim().to_snake_case();
    let mut variants = vec![snake.clone()];
    for variant in [snake.to_plural(), snake.to_singular()] {
        if !variants.contains(&variant) {
            variants.push(variant);
        }
    }
    variants
}
