//! Collaborator boundaries - the only suspension points in the pipeline.
//!
//! Semantic search, LLM refinement, and dimension-value discovery are
//! external services consumed through these traits. Each is treated as a
//! black box with bounded latency and possible failure; callers must
//! define behavior for every outcome, including "collaborator
//! unavailable". Compilation logic itself never suspends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors surfaced by external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    #[error("collaborator timed out")]
    Timeout,

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator returned a malformed response: {0}")]
    Malformed(String),
}

pub type CollabResult<T> = Result<T, CollabError>;

/// One hit from the semantic-similarity search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub score: f64,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// External semantic-similarity search over schema/value embeddings.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    async fn search(&self, text: &str, collection: &str, top_k: usize)
        -> CollabResult<Vec<SearchHit>>;
}

/// LLM decision on which candidates are relevant to an entity.
///
/// Fixed response schema; anything that fails to parse is
/// `CollabError::Malformed` and the caller falls back to the unfiltered
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDecision {
    pub relevant_indices: Vec<usize>,
    #[serde(default)]
    pub reasoning: String,
}

/// LLM decision on which database values an entity text denotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainValueDecision {
    pub matched_values: Vec<String>,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// External LLM extraction/refinement capability.
#[async_trait]
pub trait LlmExtractor: Send + Sync {
    /// Decide which of the listed candidates are relevant to the entity.
    async fn filter_candidates(
        &self,
        entity_text: &str,
        candidates: &[String],
    ) -> CollabResult<FilterDecision>;

    /// Decide which of the listed database values the entity denotes.
    async fn match_domain_values(
        &self,
        entity_text: &str,
        values: &[String],
    ) -> CollabResult<DomainValueDecision>;
}

/// A result row from the dimension value source: one JSON value per
/// selected column.
pub type Row = Vec<serde_json::Value>;

/// A query executor capable of running `SELECT DISTINCT ... GROUP BY`
/// statements for dimension-value discovery.
///
/// Errors here degrade the catalog to "implicit, no values known"; they
/// never fail a compilation.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, sql: &str) -> CollabResult<Vec<Row>>;
}
