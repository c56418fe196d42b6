//! Entity resolution: merging candidate schema bindings from multiple
//! ranked sources into a single resolved binding per extracted entity.
//!
//! Submodules:
//! - `merge`: the multi-source confidence-merge engine
//! - `temporal`: temporal/versioned column resolution

mod merge;
mod temporal;

pub use merge::{EntityResolver, ResolveContext};
pub use temporal::{temporal_predicate, TemporalColumns};

use serde::{Deserialize, Serialize};

/// What kind of concept an extracted entity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Table,
    Column,
    DimensionValue,
    Metric,
    Temporal,
    FilterExpression,
}

/// Where a candidate binding came from, in descending trust order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Operator-curated exact mapping. Wins outright.
    Local,
    /// External semantic-similarity search.
    Semantic,
    /// External LLM extraction.
    Llm,
}

/// One candidate schema binding for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub canonical_name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub column: Option<String>,
    /// Database value, for dimension-value candidates.
    #[serde(default)]
    pub value: Option<String>,
    /// Similarity/confidence score in [0, 1].
    pub score: f64,
    pub source: CandidateSource,
}

/// A semantic unit extracted from the question, with candidate bindings.
///
/// Created fresh per query, immutable once resolved, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "entity_type")]
    pub kind: EntityKind,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl Entity {
    pub fn new(text: &str, kind: EntityKind) -> Self {
        Self {
            text: text.into(),
            kind,
            candidates: vec![],
        }
    }

    pub fn with_candidate(mut self, candidate: Candidate) -> Self {
        self.candidates.push(candidate);
        self
    }
}

/// How confidently an entity was bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Exact value or curated mapping.
    Exact,
    /// Matched via a detected value prefix/category pattern.
    PrefixCategory,
    /// Semantic or fuzzy match above threshold.
    Fuzzy,
    /// Nothing survived the merge. The binding carries no values.
    Unresolved,
}

/// The final table/column/value(s) chosen for one extracted entity.
///
/// `bound_values` has length > 1 only for dimension-value entities where
/// multiple candidates exceeded the acceptance threshold; those are
/// emitted as a SQL `IN (...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBinding {
    /// Original entity text, kept for diagnostics.
    pub entity_text: String,
    pub kind: EntityKind,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub bound_values: Vec<String>,
    pub confidence: f64,
    pub match_kind: MatchKind,
    /// True when the bound values were not verified against the actual
    /// database value set, so the generated predicate must compare
    /// case-insensitively.
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ResolvedBinding {
    /// An unresolved binding for an entity nothing matched.
    pub fn unresolved(entity: &Entity) -> Self {
        Self {
            entity_text: entity.text.clone(),
            kind: entity.kind,
            table: None,
            column: None,
            bound_values: vec![],
            confidence: 0.0,
            match_kind: MatchKind::Unresolved,
            case_insensitive: false,
            warnings: vec![],
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.match_kind != MatchKind::Unresolved
    }

    /// Whether this binding contributes a WHERE predicate (as opposed to a
    /// selected column).
    pub fn is_filter(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::DimensionValue | EntityKind::Temporal | EntityKind::FilterExpression
        )
    }
}
