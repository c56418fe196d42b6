//! # sqlloom
//!
//! Compiles semantically-resolved entities into executable, dialect-aware
//! SQL. Natural-language understanding happens upstream; this crate takes
//! the extracted entities and classified intent, binds them against a
//! declared schema, and emits injection-safe SQL plus metadata about the
//! decisions made along the way.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Entities + Intent (external NLU step)             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [resolve]
//! ┌─────────────────────────────────────────────────────────┐
//! │   ResolvedBindings (multi-source confidence merge,       │
//! │   dimension values via catalog, temporal roles)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner]
//! ┌─────────────────────────────────────────────────────────┐
//! │   QueryPlan (anchor table + join tree over SchemaGraph,  │
//! │   bounded by hop/table budgets)                          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql::generate]
//! ┌─────────────────────────────────────────────────────────┐
//! │   SQL text + metadata (token-stream serialization,       │
//! │   escaping owned by the token layer)                     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The only suspension points are the collaborator boundaries in
//! [`collab`]; graph traversal and AST construction are pure CPU work.

pub mod cache;
pub mod catalog;
pub mod collab;
pub mod compile;
pub mod config;
pub mod error;
pub mod intent;
pub mod planner;
pub mod resolve;
pub mod schema;
pub mod sql;

// Re-export SQL submodules at crate level for convenience
pub use sql::dialect;
pub use sql::expr;
pub use sql::query;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::cache::{Category, ResultCache};
    pub use crate::catalog::{CaseConvention, DimensionCatalog, ValueSet};
    pub use crate::compile::{CompiledQuery, Compiler};
    pub use crate::config::Settings;
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::error::{CompileError, CompileResult};
    pub use crate::intent::{Aggregation, Intent, IntentKind, TimeScope};
    pub use crate::planner::{PlannerCaps, QueryPlan, QueryPlanner};
    pub use crate::resolve::{
        Candidate, CandidateSource, Entity, EntityKind, EntityResolver, MatchKind,
        ResolveContext, ResolvedBinding,
    };
    pub use crate::schema::{
        Column, DataType, JoinPath, Relationship, SchemaDef, SchemaGraph, Table, TemporalRole,
        VersionRole,
    };
    pub use crate::sql::{GeneratedQuery, Query, QueryMetadata, SqlGenerator};
}
