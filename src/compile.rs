//! Compilation pipeline orchestration.
//!
//! One [`Compiler`] serves many concurrent queries: the schema graph and
//! caches are shared read-heavy state, everything else is built fresh per
//! call. Collaborators are optional; a compiler with none configured
//! still resolves whatever the upstream extraction provided. Every
//! external call is bounded by a timeout and degrades to a warning;
//! only the overall deadline is fatal.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{sql_cache_key, Category, ResultCache};
use crate::catalog::{DimensionCatalog, ValueSet};
use crate::collab::{CollabError, CollabResult, LlmExtractor, SemanticSearch};
use crate::config::Settings;
use crate::error::{CompileError, CompileResult};
use crate::intent::{Intent, IntentKind};
use crate::planner::QueryPlanner;
use crate::resolve::{
    Candidate, CandidateSource, Entity, EntityKind, EntityResolver, ResolveContext,
    ResolvedBinding,
};
use crate::schema::SchemaGraph;
use crate::sql::{Dialect, SqlGenerator};

/// The compiled output: SQL text plus what the compiler did to get it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub tables_used: Vec<String>,
    pub join_count: usize,
    pub where_count: usize,
    pub aggregations_applied: Vec<String>,
    pub warnings: Vec<String>,
}

/// Orchestrates resolution, planning, and generation for one schema.
pub struct Compiler {
    schema: Arc<SchemaGraph>,
    settings: Settings,
    dialect: Dialect,
    cache: ResultCache,
    catalog: Option<Arc<DimensionCatalog>>,
    search: Option<Arc<dyn SemanticSearch>>,
    llm: Option<Arc<dyn LlmExtractor>>,
}

impl Compiler {
    pub fn new(schema: Arc<SchemaGraph>, settings: Settings) -> CompileResult<Self> {
        let dialect = settings
            .sql_dialect()
            .map_err(|e| CompileError::InvalidSchema(e.to_string()))?;
        Ok(Self {
            schema,
            settings,
            dialect,
            cache: ResultCache::in_process(),
            catalog: None,
            search: None,
            llm: None,
        })
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<DimensionCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_semantic_search(mut self, search: Arc<dyn SemanticSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmExtractor>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Compile one question's entities and intent into SQL.
    ///
    /// Honors the configured deadline; a query that cannot finish in time
    /// fails with `DeadlineExceeded` rather than hanging the caller.
    pub async fn compile(
        &self,
        entities: &[Entity],
        intent: &Intent,
    ) -> CompileResult<CompiledQuery> {
        tokio::time::timeout(
            self.settings.compile.deadline(),
            self.compile_inner(entities, intent),
        )
        .await
        .map_err(|_| CompileError::DeadlineExceeded {
            what: "query compilation".into(),
        })?
    }

    async fn compile_inner(
        &self,
        entities: &[Entity],
        intent: &Intent,
    ) -> CompileResult<CompiledQuery> {
        let mut warnings: Vec<String> = vec![];

        let entities = self.enrich(entities, &mut warnings).await;
        let bindings = self.resolve_all(&entities, &mut warnings).await;

        if let Some(cached) = self.cached_query(&entities, intent, &bindings) {
            debug!("generated-SQL cache hit");
            return Ok(cached);
        }

        let caps = self.settings.planner.caps();
        let mut plan = QueryPlanner::plan(&bindings, &self.schema, intent, &caps)?;
        if intent.kind == IntentKind::Ranking {
            QueryPlanner::add_label_column(&mut plan, &self.schema, &caps);
        }

        let generator = SqlGenerator::new(self.dialect)
            .with_default_limit(self.settings.generator.default_limit)
            .with_default_top_n(self.settings.generator.default_top_n);
        let generated = generator.generate(&plan, &bindings, intent, &self.schema)?;

        let mut metadata = generated.metadata;
        metadata.warnings.extend(warnings);

        let compiled = CompiledQuery {
            sql: generated.sql,
            tables_used: metadata.tables_used,
            join_count: metadata.join_count,
            where_count: metadata.where_count,
            aggregations_applied: metadata.aggregations_applied,
            warnings: metadata.warnings,
        };

        self.store_query(&entities, intent, &bindings, &compiled);
        info!(
            tables = compiled.tables_used.len(),
            joins = compiled.join_count,
            warnings = compiled.warnings.len(),
            "query compiled"
        );
        Ok(compiled)
    }

    /// Fill in candidates for entities the upstream step left bare, via
    /// semantic search and LLM refinement. Any collaborator failure
    /// degrades to the unenriched entity.
    async fn enrich(&self, entities: &[Entity], warnings: &mut Vec<String>) -> Vec<Entity> {
        let mut out = Vec::with_capacity(entities.len());
        for entity in entities {
            let mut entity = entity.clone();

            if entity.candidates.is_empty() {
                if let Some(search) = &self.search {
                    let collection = search_collection(entity.kind);
                    match self
                        .bounded(search.search(&entity.text, collection, 5))
                        .await
                    {
                        Ok(hits) => {
                            for hit in hits {
                                entity.candidates.push(Candidate {
                                    canonical_name: hit.content,
                                    table: hit.table,
                                    column: hit.column,
                                    value: hit.value,
                                    score: hit.score,
                                    source: CandidateSource::Semantic,
                                });
                            }
                        }
                        Err(e) => warnings.push(format!(
                            "semantic search unavailable for '{}': {}",
                            entity.text, e
                        )),
                    }
                }
            }

            if entity.candidates.len() > 1 {
                if let Some(llm) = &self.llm {
                    let names: Vec<String> = entity
                        .candidates
                        .iter()
                        .map(|c| c.canonical_name.clone())
                        .collect();
                    match self.bounded(llm.filter_candidates(&entity.text, &names)).await {
                        Ok(decision) => {
                            let keep: Vec<Candidate> = decision
                                .relevant_indices
                                .iter()
                                .filter_map(|&i| entity.candidates.get(i).cloned())
                                .collect();
                            if !keep.is_empty() {
                                entity.candidates = keep;
                            }
                        }
                        // Fall back to the unfiltered set
                        Err(e) => warnings.push(format!(
                            "candidate filtering unavailable for '{}': {}",
                            entity.text, e
                        )),
                    }
                }
            }

            out.push(entity);
        }
        out
    }

    async fn resolve_all(
        &self,
        entities: &[Entity],
        warnings: &mut Vec<String>,
    ) -> Vec<ResolvedBinding> {
        let mut bindings = Vec::with_capacity(entities.len());
        for entity in entities {
            let binding = match self.dimension_target(entity) {
                Some((table, column)) if entity.kind == EntityKind::DimensionValue => {
                    let set = self.value_set(&table, &column, warnings).await;
                    let entity = self.match_domain_values(entity, &set, warnings).await;
                    let ctx = self
                        .resolve_context()
                        .with_dimension(&table, &column, &set);
                    EntityResolver::resolve(&entity, &ctx)
                }
                _ => EntityResolver::resolve(entity, &self.resolve_context()),
            };
            bindings.push(binding);
        }
        bindings
    }

    fn resolve_context(&self) -> ResolveContext<'_> {
        let mut ctx = ResolveContext::new(&self.schema);
        ctx.schema_threshold = self.settings.resolver.schema_threshold;
        ctx.business_threshold = self.settings.resolver.business_threshold;
        ctx.ambiguity_ceiling = self.settings.resolver.ambiguity_ceiling;
        ctx
    }

    /// The (table, column) a dimension entity's candidates point at.
    fn dimension_target(&self, entity: &Entity) -> Option<(String, String)> {
        entity
            .candidates
            .iter()
            .find_map(|c| match (&c.table, &c.column) {
                (Some(t), Some(col)) => Some((t.clone(), col.clone())),
                _ => None,
            })
    }

    async fn value_set(
        &self,
        table: &str,
        column: &str,
        warnings: &mut Vec<String>,
    ) -> ValueSet {
        let Some(catalog) = &self.catalog else {
            return ValueSet::implicit();
        };
        let lookup = self
            .schema
            .table(table)
            .and_then(|t| t.column(column))
            .and_then(|c| c.lookup_table.clone());

        match tokio::time::timeout(
            self.settings.compile.collaborator_timeout(),
            catalog.values(table, column, lookup.as_deref()),
        )
        .await
        {
            Ok(set) => set,
            Err(_) => {
                warnings.push(format!(
                    "dimension value discovery for {}.{} timed out",
                    table, column
                ));
                ValueSet::implicit()
            }
        }
    }

    /// Ask the LLM which database values a bare dimension entity denotes.
    /// Only consulted when the entity arrived with no candidates and real
    /// values are known.
    async fn match_domain_values(
        &self,
        entity: &Entity,
        set: &ValueSet,
        warnings: &mut Vec<String>,
    ) -> Entity {
        if !entity.candidates.is_empty() || set.implicit || set.values.is_empty() {
            return entity.clone();
        }
        let Some(llm) = &self.llm else {
            return entity.clone();
        };

        let values: Vec<String> = set.values.iter().map(|v| v.value.clone()).collect();
        match self
            .bounded(llm.match_domain_values(&entity.text, &values))
            .await
        {
            Ok(decision) => {
                let mut entity = entity.clone();
                for value in decision.matched_values {
                    entity.candidates.push(Candidate {
                        canonical_name: value.clone(),
                        table: None,
                        column: None,
                        value: Some(value),
                        score: decision.confidence,
                        source: CandidateSource::Llm,
                    });
                }
                entity
            }
            Err(e) => {
                warnings.push(format!(
                    "domain value matching unavailable for '{}': {}",
                    entity.text, e
                ));
                entity.clone()
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = CollabResult<T>>,
    ) -> CollabResult<T> {
        match tokio::time::timeout(self.settings.compile.collaborator_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(CollabError::Timeout),
        }
    }

    fn query_cache_key(
        &self,
        entities: &[Entity],
        intent: &Intent,
        bindings: &[ResolvedBinding],
    ) -> Option<String> {
        let question: String = entities
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let columns: Vec<String> = bindings
            .iter()
            .filter_map(|b| match (&b.table, &b.column) {
                (Some(t), Some(c)) => Some(format!("{}.{}", t, c)),
                _ => None,
            })
            .collect();
        let tables: Vec<String> = bindings.iter().filter_map(|b| b.table.clone()).collect();
        // The key covers everything generation consumes: the full intent
        // (kind, top-N, time scope, filters, aggregations) and every
        // binding's bound values. Anything less and distinct requests
        // would be served each other's SQL.
        let values: Vec<String> = bindings
            .iter()
            .filter(|b| !b.bound_values.is_empty())
            .map(|b| {
                format!(
                    "{}.{}={}",
                    b.table.as_deref().unwrap_or(""),
                    b.column.as_deref().unwrap_or(""),
                    b.bound_values.join("|")
                )
            })
            .collect();
        let intent_sig = serde_json::to_string(intent).ok()?;
        sql_cache_key(&question, &intent_sig, &columns, &tables, &values).ok()
    }

    fn cached_query(
        &self,
        entities: &[Entity],
        intent: &Intent,
        bindings: &[ResolvedBinding],
    ) -> Option<CompiledQuery> {
        if !self.settings.cache.enabled {
            return None;
        }
        let key = self.query_cache_key(entities, intent, bindings)?;
        self.cache.get(Category::GeneratedSql, &key)
    }

    fn store_query(
        &self,
        entities: &[Entity],
        intent: &Intent,
        bindings: &[ResolvedBinding],
        compiled: &CompiledQuery,
    ) {
        if !self.settings.cache.enabled {
            return;
        }
        if let Some(key) = self.query_cache_key(entities, intent, bindings) {
            self.cache.put(
                Category::GeneratedSql,
                &key,
                compiled,
                self.settings.cache.sql_ttl(),
            );
        }
    }
}

fn search_collection(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Table | EntityKind::Column | EntityKind::Metric => "schema",
        EntityKind::DimensionValue => "dimension_values",
        EntityKind::Temporal | EntityKind::FilterExpression => "business_context",
    }
}

