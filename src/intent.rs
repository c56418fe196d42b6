//! Classified query intent, produced by the upstream extraction step.
//!
//! This crate trusts but validates: the intent shape is deserialized as-is,
//! while every entity it references must independently resolve against the
//! schema before it can influence the generated SQL.

use serde::{Deserialize, Serialize};

/// The four query shapes the generator knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    #[default]
    Retrieval,
    Aggregate,
    Comparison,
    Ranking,
}

impl IntentKind {
    /// Whether this intent forces aggregation onto numeric columns.
    pub fn is_aggregating(&self) -> bool {
        matches!(
            self,
            IntentKind::Aggregate | IntentKind::Comparison | IntentKind::Ranking
        )
    }
}

/// Aggregate functions the upstream step may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Avg,
    Count,
    CountDistinct,
    Min,
    Max,
}

impl Aggregation {
    /// SQL function name.
    pub fn function_name(&self) -> &'static str {
        match self {
            Aggregation::Sum => "SUM",
            Aggregation::Avg => "AVG",
            Aggregation::Count | Aggregation::CountDistinct => "COUNT",
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
        }
    }
}

/// Temporal scope of the question.
///
/// Dates are ISO-8601 strings (`YYYY-MM-DD`), validated at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TimeScope {
    /// Only current rows (the default when no qualifier is given).
    #[default]
    Current,
    /// Rows valid at a specific date.
    AsOf { date: String },
    /// Rows within an explicit date range.
    Range { from: String, to: String },
    /// All rows, including superseded/inactive ones. Suppresses schema
    /// default filters.
    Historical,
}

/// The classified intent for one question.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: IntentKind,
    /// Explicit aggregation requests, highest priority wins.
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
    #[serde(default)]
    pub time_scope: Option<TimeScope>,
    /// Free-text filter fragments the extractor could not structure.
    #[serde(default)]
    pub filters: Vec<String>,
    /// Requested N for ranking intents.
    #[serde(default)]
    pub top_n: Option<u64>,
}

impl Intent {
    pub fn new(kind: IntentKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Whether default table filters should be suppressed.
    pub fn wants_historical(&self) -> bool {
        matches!(self.time_scope, Some(TimeScope::Historical))
    }
}
