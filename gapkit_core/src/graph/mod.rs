//! Declaration dependency graph.
//!
//! Edge direction: `A -> B` means "A depends on B".

mod pagerank;

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use serde::{Deserialize, Serialize};

use crate::error::{GapError, Result};
use crate::types::{DeclarationNode, DeclarationRecord, DependencyEdge, PremisesRecord};

pub use pagerank::{PageRankConfig, DEFAULT_DAMPING};

/// Directed graph of declarations and their dependencies.
///
/// Built once from parsed records, then queried read-only. Node names are
/// unique; a repeated `(from, to)` mention keeps a single edge whose flags
/// are those of the latest mention.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<DeclarationNode, DependencyEdge>,
    /// name -> index, in node insertion order
    node_indices: IndexMap<String, NodeIndex>,
}

/// Summary counts for a graph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from parsed premises and declaration records.
    ///
    /// Declarations are inserted first so that their kind and signature are
    /// attached before any dependency mention can create a bare node.
    pub fn from_records(premises: &[PremisesRecord], declarations: &[DeclarationRecord]) -> Self {
        let mut graph = Self::new();

        for decl in declarations {
            graph.add_declaration(DeclarationNode {
                name: decl.name.clone(),
                kind: Some(decl.kind.clone()),
                type_signature: Some(decl.type_signature.clone()),
            });
        }

        for entry in premises {
            let from = graph.ensure_node(&entry.name);
            for dep in &entry.dependencies {
                let to = graph.ensure_node(&dep.name);
                graph.graph.update_edge(from, to, DependencyEdge::from(dep));
            }
        }

        graph
    }

    /// Inserts a node, replacing the attributes of an existing one.
    pub fn add_declaration(&mut self, node: DeclarationNode) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(&node.name) {
            self.graph[idx] = node;
            return idx;
        }
        let name = node.name.clone();
        let idx = self.graph.add_node(node);
        self.node_indices.insert(name, idx);
        idx
    }

    /// Adds a dependency edge, creating bare nodes for unknown endpoints.
    pub fn add_dependency(&mut self, from: &str, to: &str, edge: DependencyEdge) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        self.graph.update_edge(from_idx, to_idx, edge);
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(DeclarationNode::bare(name));
        self.node_indices.insert(name.to_string(), idx);
        idx
    }

    /// Node names in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_weights().map(|n| n.name.as_str())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.node_indices.get(from), self.node_indices.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Attributes of a node.
    pub fn node_attrs(&self, name: &str) -> Result<&DeclarationNode> {
        let idx = self.index_of(name)?;
        Ok(&self.graph[idx])
    }

    /// Flags of the edge `from -> to`.
    pub fn edge_attrs(&self, from: &str, to: &str) -> Result<DependencyEdge> {
        let a = self.index_of(from)?;
        let b = self.index_of(to)?;
        let edge = self
            .graph
            .find_edge(a, b)
            .ok_or_else(|| GapError::NotFound(format!("Edge {} -> {} not found in graph", from, to)))?;
        Ok(self.graph[edge])
    }

    /// Direct dependencies of `name`, in the order they were first mentioned.
    ///
    /// Unknown names have no dependencies.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };
        // petgraph walks the adjacency list newest first
        let mut deps: Vec<&str> = self
            .graph
            .edges(idx)
            .map(|e| self.graph[e.target()].name.as_str())
            .collect();
        deps.reverse();
        deps
    }

    /// Size of the transitive dependency closure of `name`, excluding itself.
    pub fn descendants_count(&self, name: &str) -> usize {
        let Some(&idx) = self.node_indices.get(name) else {
            return 0;
        };
        let mut dfs = Dfs::new(&self.graph, idx);
        let mut visited = 0usize;
        while dfs.next(&self.graph).is_some() {
            visited += 1;
        }
        visited.saturating_sub(1)
    }

    /// PageRank with the default damping and convergence settings.
    pub fn pagerank(&self) -> HashMap<String, f64> {
        self.pagerank_with(&PageRankConfig::default())
    }

    pub fn pagerank_with(&self, config: &PageRankConfig) -> HashMap<String, f64> {
        // not petgraph::algo::page_rank: dangling mass and the L1 stop differ
        let ranks = pagerank::power_iteration(&self.graph, config);
        self.graph
            .node_indices()
            .map(|idx| (self.graph[idx].name.clone(), ranks[idx.index()]))
            .collect()
    }

    /// Induced subgraph over the nodes whose name starts with any prefix.
    pub fn filter_by_prefix<S: AsRef<str>>(&self, prefixes: &[S]) -> DependencyGraph {
        let graph = self.graph.filter_map(
            |_, node| {
                prefixes
                    .iter()
                    .any(|p| node.name.starts_with(p.as_ref()))
                    .then(|| node.clone())
            },
            |_, edge| Some(*edge),
        );
        let node_indices = graph
            .node_indices()
            .map(|idx| (graph[idx].name.clone(), idx))
            .collect();
        DependencyGraph { graph, node_indices }
    }

    /// Type signature of `name`, or `None` when unknown or empty.
    pub fn type_signature_of(&self, name: &str) -> Option<&str> {
        let idx = self.node_indices.get(name)?;
        self.graph[*idx]
            .type_signature
            .as_deref()
            .filter(|sig| !sig.is_empty())
    }

    pub fn statistics(&self) -> GraphStatistics {
        let n = self.node_count();
        let e = self.edge_count();
        let density = if n > 1 {
            e as f64 / (n as f64 * (n as f64 - 1.0))
        } else {
            0.0
        };
        GraphStatistics {
            node_count: n,
            edge_count: e,
            density,
        }
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex> {
        self.node_indices
            .get(name)
            .copied()
            .ok_or_else(|| GapError::NotFound(format!("Declaration {} not found in graph", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dependency;

    fn dep(name: &str, is_explicit: bool, is_simp: bool) -> Dependency {
        Dependency {
            name: name.to_string(),
            is_explicit,
            is_simp,
        }
    }

    fn decl(kind: &str, name: &str, sig: &str) -> DeclarationRecord {
        DeclarationRecord {
            kind: kind.to_string(),
            name: name.to_string(),
            type_signature: sig.to_string(),
        }
    }

    fn sample_graph() -> DependencyGraph {
        let premises = vec![
            PremisesRecord {
                name: "Nat.add_comm".to_string(),
                dependencies: vec![
                    dep("Nat.rec", true, false),
                    dep("Nat.add", true, false),
                    dep("Nat.add_succ", false, false),
                ],
            },
            PremisesRecord {
                name: "Nat.add_succ".to_string(),
                dependencies: vec![dep("Nat.succ", false, true)],
            },
        ];
        let declarations = vec![
            decl("theorem", "Nat.add_comm", "∀ (n m : Nat), n + m = m + n"),
            decl("definition", "Nat.add", "Nat → Nat → Nat"),
        ];
        DependencyGraph::from_records(&premises, &declarations)
    }

    #[test]
    fn test_nodes_and_edges() {
        let graph = sample_graph();
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert!(graph.has_node("Nat.succ"));
        assert!(graph.has_edge("Nat.add_comm", "Nat.rec"));
        assert!(!graph.has_edge("Nat.rec", "Nat.add_comm"));
    }

    #[test]
    fn test_node_attrs() {
        let graph = sample_graph();
        let node = graph.node_attrs("Nat.add_comm").unwrap();
        assert_eq!(node.kind.as_deref(), Some("theorem"));

        let bare = graph.node_attrs("Nat.rec").unwrap();
        assert!(bare.kind.is_none());
        assert!(bare.type_signature.is_none());
    }

    #[test]
    fn test_node_attrs_not_found() {
        let graph = sample_graph();
        assert!(matches!(graph.node_attrs("Nope"), Err(GapError::NotFound(_))));
        assert!(matches!(
            graph.edge_attrs("Nat.add", "Nat.rec"),
            Err(GapError::NotFound(_))
        ));
    }

    #[test]
    fn test_edge_attrs() {
        let graph = sample_graph();
        let edge = graph.edge_attrs("Nat.add_succ", "Nat.succ").unwrap();
        assert!(edge.is_simp);
        assert!(!edge.is_explicit);
    }

    #[test]
    fn test_duplicate_mention_overwrites_flags() {
        let premises = vec![PremisesRecord {
            name: "A".to_string(),
            dependencies: vec![dep("B", true, false), dep("C", false, false), dep("B", false, true)],
        }];
        let graph = DependencyGraph::from_records(&premises, &[]);
        assert_eq!(graph.edge_count(), 2);
        let edge = graph.edge_attrs("A", "B").unwrap();
        assert!(!edge.is_explicit);
        assert!(edge.is_simp);
        assert_eq!(graph.dependencies_of("A"), vec!["B", "C"]);
    }

    #[test]
    fn test_dependencies_in_mention_order() {
        let graph = sample_graph();
        assert_eq!(
            graph.dependencies_of("Nat.add_comm"),
            vec!["Nat.rec", "Nat.add", "Nat.add_succ"]
        );
        assert!(graph.dependencies_of("Unknown").is_empty());
    }

    #[test]
    fn test_name_index_follows_node_order() {
        let graph = sample_graph();
        let indexed: Vec<&str> = graph.node_indices.keys().map(String::as_str).collect();
        assert_eq!(indexed, graph.nodes().collect::<Vec<_>>());

        let filtered = graph.filter_by_prefix(&["Nat.add"]);
        let indexed: Vec<&str> = filtered.node_indices.keys().map(String::as_str).collect();
        assert_eq!(indexed, filtered.nodes().collect::<Vec<_>>());
    }

    #[test]
    fn test_descendants_count() {
        let graph = sample_graph();
        assert_eq!(graph.descendants_count("Nat.add_comm"), 4);
        assert_eq!(graph.descendants_count("Nat.add_succ"), 1);
        assert_eq!(graph.descendants_count("Nat.succ"), 0);
        assert_eq!(graph.descendants_count("Unknown"), 0);
    }

    #[test]
    fn test_type_signature_of() {
        let graph = sample_graph();
        assert_eq!(graph.type_signature_of("Nat.add"), Some("Nat → Nat → Nat"));
        assert_eq!(graph.type_signature_of("Nat.rec"), None);
        assert_eq!(graph.type_signature_of("Unknown"), None);
    }

    #[test]
    fn test_filter_by_prefix_is_induced() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("Group.a", "Group.b", DependencyEdge::default());
        graph.add_dependency("Group.a", "Ring.c", DependencyEdge::default());
        graph.add_dependency("Ring.c", "Ring.d", DependencyEdge::default());

        let sub = graph.filter_by_prefix(&["Group."]);
        assert_eq!(sub.node_count(), 2);
        assert_eq!(sub.edge_count(), 1);
        assert!(sub.has_edge("Group.a", "Group.b"));
        assert!(!sub.has_node("Ring.c"));
    }

    #[test]
    fn test_pagerank_sums_to_one() {
        let graph = sample_graph();
        let ranks = graph.pagerank();
        assert_eq!(ranks.len(), graph.node_count());
        let total: f64 = ranks.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(ranks["Nat.succ"] > ranks["Nat.add_comm"]);
    }

    #[test]
    fn test_statistics() {
        let graph = sample_graph();
        let stats = graph.statistics();
        assert_eq!(stats.node_count, 5);
        assert_eq!(stats.edge_count, 4);
        assert!((stats.density - 0.2).abs() < 1e-12);
    }
}
