//! SchemaGraph - graph representation of the relational schema.
//!
//! Tables are nodes, declared foreign-key relationships are edges. The
//! graph is built once per schema load and is read-only afterwards, so an
//! `Arc<SchemaGraph>` can be shared freely across concurrent compilations.
//!
//! Submodules:
//! - `path`: BFS path finding between tables (for JOIN generation)

mod path;

pub use path::{JoinEdge, JoinPath, PathError};

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// Role a column plays in temporal validity tracking.
///
/// `EndDate` columns carry explicit NULL semantics: a NULL end date means
/// the row is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalRole {
    #[default]
    None,
    EffectiveDate,
    EndDate,
}

/// Role a column plays in version tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionRole {
    #[default]
    None,
    VersionNumber,
    LatestFlag,
}

/// Broad column data types, enough to drive aggregation and comparison
/// decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Integer,
    Decimal,
    Text,
    Boolean,
    Date,
    Timestamp,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Decimal)
    }
}

/// A column in a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    /// Whether this is a categorical column with an enumerable value set.
    #[serde(default)]
    pub is_dimension: bool,
    /// Explicit lookup table holding the distinct values, if one exists.
    #[serde(default)]
    pub lookup_table: Option<String>,
    #[serde(default)]
    pub temporal_role: TemporalRole,
    #[serde(default)]
    pub version_role: VersionRole,
}

impl Column {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_dimension: false,
            lookup_table: None,
            temporal_role: TemporalRole::None,
            version_role: VersionRole::None,
        }
    }

    pub fn dimension(mut self) -> Self {
        self.is_dimension = true;
        self
    }

    pub fn with_lookup_table(mut self, table: &str) -> Self {
        self.lookup_table = Some(table.into());
        self
    }

    pub fn with_temporal_role(mut self, role: TemporalRole) -> Self {
        self.temporal_role = role;
        self
    }

    pub fn with_version_role(mut self, role: VersionRole) -> Self {
        self.version_role = role;
        self
    }
}

/// A table in the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub primary_key: Option<String>,
    /// Predicates applied unless the query explicitly requests historical
    /// or unfiltered data, e.g. `is_active = TRUE`.
    ///
    /// These are operator-curated SQL fragments, never user input.
    #[serde(default)]
    pub default_filters: Vec<String>,
    /// Human-readable label column (e.g. `name`), used when the planner is
    /// asked to add identifying context for ranking queries.
    #[serde(default)]
    pub label_column: Option<String>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            columns: vec![],
            primary_key: None,
            default_filters: vec![],
            label_column: None,
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, key: &str) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    pub fn with_default_filter(mut self, predicate: &str) -> Self {
        self.default_filters.push(predicate.into());
        self
    }

    pub fn with_label_column(mut self, column: &str) -> Self {
        self.label_column = Some(column.into());
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A declared foreign-key relationship between two tables.
///
/// Undirected for path finding, directional for SQL emission: `from`
/// holds the foreign key, `to` holds the referenced primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    /// Optional relationships (e.g. transaction history that may not exist
    /// for every row) become LEFT JOINs.
    #[serde(default)]
    pub optional: bool,
}

/// Serde shape of a schema definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDef {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

/// The schema relationship graph.
///
/// Static per schema load; no mutation during query compilation.
#[derive(Debug)]
pub struct SchemaGraph {
    graph: UnGraph<String, Relationship>,
    node_indices: HashMap<String, NodeIndex>,
    tables: HashMap<String, Table>,
}

impl SchemaGraph {
    /// Build a graph from a schema definition, validating as we go.
    ///
    /// Validation failures are load-time errors; compilation never has to
    /// re-check edge endpoints.
    pub fn build(def: SchemaDef) -> CompileResult<Self> {
        let mut graph = UnGraph::new_undirected();
        let mut node_indices = HashMap::new();
        let mut tables = HashMap::new();

        for table in def.tables {
            if tables.contains_key(&table.name) {
                return Err(CompileError::InvalidSchema(format!(
                    "duplicate table '{}'",
                    table.name
                )));
            }
            let idx = graph.add_node(table.name.clone());
            node_indices.insert(table.name.clone(), idx);
            tables.insert(table.name.clone(), table);
        }

        for rel in def.relationships {
            let from = Self::check_endpoint(&tables, &rel.from_table, &rel.from_column)?;
            let to = Self::check_endpoint(&tables, &rel.to_table, &rel.to_column)?;
            let from_idx = node_indices[&from];
            let to_idx = node_indices[&to];
            graph.add_edge(from_idx, to_idx, rel);
        }

        Ok(Self {
            graph,
            node_indices,
            tables,
        })
    }

    /// Load a schema from JSON text.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        let def: SchemaDef = serde_json::from_str(json)
            .map_err(|e| CompileError::InvalidSchema(e.to_string()))?;
        Self::build(def)
    }

    fn check_endpoint(
        tables: &HashMap<String, Table>,
        table: &str,
        column: &str,
    ) -> CompileResult<String> {
        let t = tables
            .get(table)
            .ok_or_else(|| CompileError::UnknownTable(table.into()))?;
        if t.column(column).is_none() {
            return Err(CompileError::UnknownColumn {
                table: table.into(),
                column: column.into(),
            });
        }
        Ok(table.into())
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// All table names, sorted for deterministic iteration.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether a table exists in the graph.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Whether any other table's relationships reference this table's
    /// primary key. Used as an anchor tie-break by the planner.
    pub fn is_referenced(&self, table: &str) -> bool {
        let Some(pk) = self.tables.get(table).and_then(|t| t.primary_key.as_deref()) else {
            return false;
        };
        self.graph
            .edge_weights()
            .any(|rel| rel.to_table == table && rel.to_column == pk)
    }

    pub(crate) fn node_index(&self, table: &str) -> Option<NodeIndex> {
        self.node_indices.get(table).copied()
    }

    pub(crate) fn inner(&self) -> &UnGraph<String, Relationship> {
        &self.graph
    }
}
