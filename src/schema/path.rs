//! Path finding over the schema graph.
//!
//! BFS between tables along declared foreign-key relationships, producing
//! the join edges SQL generation needs. Joins are never inferred from
//! column-name similarity; only declared edges are traversed.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::SchemaGraph;

/// One join step: the foreign-key side and the referenced side, oriented
/// from the path's starting table outwards.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinEdge {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub optional: bool,
}

/// An ordered sequence of join edges connecting a set of tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinPath {
    pub edges: Vec<JoinEdge>,
}

impl JoinPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct tables touched by this path, in first-seen order.
    pub fn tables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut out = vec![];
        for edge in &self.edges {
            for t in [edge.from_table.as_str(), edge.to_table.as_str()] {
                if seen.insert(t) {
                    out.push(t);
                }
            }
        }
        out
    }
}

/// Why a path could not be produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PathError {
    /// No route exists between the two tables.
    NoPath { from: String, to: String },
    /// A route exists but exceeds the hop or table budget.
    ///
    /// Non-fatal to callers adding optional context; they degrade instead.
    TooComplex {
        tables: Vec<String>,
        max_hops: usize,
        max_tables: usize,
    },
    /// A table name is not in the graph.
    UnknownTable(String),
}

struct ParentInfo {
    parent: NodeIndex,
    edge_idx: EdgeIndex,
}

impl SchemaGraph {
    /// Find the shortest path between two tables using BFS.
    ///
    /// Paths longer than `max_hops` edges are rejected as `TooComplex`.
    /// Uses parent pointers instead of cloning paths at each step.
    pub fn find_path(&self, from: &str, to: &str, max_hops: usize) -> Result<JoinPath, PathError> {
        if from == to {
            return Ok(JoinPath::new());
        }

        let from_idx = self
            .node_index(from)
            .ok_or_else(|| PathError::UnknownTable(from.into()))?;
        let to_idx = self
            .node_index(to)
            .ok_or_else(|| PathError::UnknownTable(to.into()))?;

        let graph = self.inner();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut parents: HashMap<NodeIndex, ParentInfo> = HashMap::new();
        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();

        queue.push_back(from_idx);
        visited.insert(from_idx);
        depth.insert(from_idx, 0);

        while let Some(current) = queue.pop_front() {
            let current_depth = depth[&current];

            for edge_ref in graph.edges(current) {
                let neighbor = edge_ref.target();

                if visited.contains(&neighbor) {
                    continue;
                }

                parents.insert(
                    neighbor,
                    ParentInfo {
                        parent: current,
                        edge_idx: edge_ref.id(),
                    },
                );
                depth.insert(neighbor, current_depth + 1);

                if neighbor == to_idx {
                    if current_depth + 1 > max_hops {
                        return Err(PathError::TooComplex {
                            tables: vec![from.into(), to.into()],
                            max_hops,
                            max_tables: usize::MAX,
                        });
                    }
                    return Ok(self.reconstruct_path(from_idx, neighbor, &parents));
                }

                // No point exploring past the hop budget
                if current_depth + 1 < max_hops {
                    queue.push_back(neighbor);
                }
                visited.insert(neighbor);
            }
        }

        Err(PathError::NoPath {
            from: from.into(),
            to: to.into(),
        })
    }

    /// Reconstruct the path from parent pointers, orienting each edge from
    /// the walk direction (the stored relationship may point either way).
    fn reconstruct_path(
        &self,
        from_idx: NodeIndex,
        to_idx: NodeIndex,
        parents: &HashMap<NodeIndex, ParentInfo>,
    ) -> JoinPath {
        let graph = self.inner();
        let mut edges = Vec::new();
        let mut current = to_idx;

        while current != from_idx {
            let info = &parents[&current];
            let rel = &graph[info.edge_idx];
            let from_name = &graph[info.parent];
            let to_name = &graph[current];

            // Orient the declared relationship to match the walk direction.
            let edge = if &rel.from_table == from_name {
                JoinEdge {
                    from_table: rel.from_table.clone(),
                    from_column: rel.from_column.clone(),
                    to_table: rel.to_table.clone(),
                    to_column: rel.to_column.clone(),
                    optional: rel.optional,
                }
            } else {
                JoinEdge {
                    from_table: rel.to_table.clone(),
                    from_column: rel.to_column.clone(),
                    to_table: rel.from_table.clone(),
                    to_column: rel.from_column.clone(),
                    optional: rel.optional,
                }
            };
            debug_assert_eq!(&edge.to_table, to_name);

            edges.push(edge);
            current = info.parent;
        }

        edges.reverse();
        JoinPath { edges }
    }

    /// Find a deduplicated join tree connecting `root` to every target.
    ///
    /// Targets already reachable through edges collected for an earlier
    /// target cost nothing extra; each new path is searched from the set of
    /// already-included tables, preferring routes through them over fresh
    /// ones. `max_hops` bounds each individual path and `max_tables` bounds
    /// the total table count - exceeding either yields `TooComplex`.
    pub fn find_join_tree(
        &self,
        root: &str,
        targets: &[&str],
        max_hops: usize,
        max_tables: usize,
    ) -> Result<JoinPath, PathError> {
        let mut all_edges: Vec<JoinEdge> = vec![];
        let mut included: HashSet<String> = HashSet::new();
        included.insert(root.to_string());

        // Deterministic target order regardless of caller ordering
        let mut sorted_targets: Vec<&str> = targets.to_vec();
        sorted_targets.sort_unstable();
        sorted_targets.dedup();

        for target in sorted_targets {
            if included.contains(target) {
                continue;
            }

            // Prefer the already-included table with the shortest route to
            // the target, so shared joins are reused instead of duplicated.
            let mut sources: Vec<&String> = included.iter().collect();
            sources.sort_unstable();

            let mut best: Option<JoinPath> = None;
            for source in sources {
                match self.find_path(source, target, max_hops) {
                    Ok(path) => {
                        let better = match &best {
                            None => true,
                            Some(b) => path.edges.len() < b.edges.len(),
                        };
                        if better {
                            best = Some(path);
                        }
                    }
                    Err(PathError::NoPath { .. }) | Err(PathError::TooComplex { .. }) => continue,
                    Err(e @ PathError::UnknownTable(_)) => return Err(e),
                }
            }

            let path = best.ok_or_else(|| PathError::NoPath {
                from: root.into(),
                to: target.into(),
            })?;

            for edge in path.edges {
                included.insert(edge.from_table.clone());
                included.insert(edge.to_table.clone());
                if !contains_edge(&all_edges, &edge) {
                    all_edges.push(edge);
                }
            }

            if included.len() > max_tables {
                let mut tables: Vec<String> = included.into_iter().collect();
                tables.sort_unstable();
                return Err(PathError::TooComplex {
                    tables,
                    max_hops,
                    max_tables,
                });
            }
        }

        Ok(JoinPath { edges: all_edges })
    }
}

fn contains_edge(edges: &[JoinEdge], edge: &JoinEdge) -> bool {
    edges
        .iter()
        .any(|e| e.from_table == edge.from_table && e.to_table == edge.to_table)
}
