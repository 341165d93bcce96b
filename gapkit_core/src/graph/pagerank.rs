//! Power-iteration PageRank over the dependency direction.

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

pub const DEFAULT_DAMPING: f64 = 0.85;

/// Convergence settings for [`power_iteration`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageRankConfig {
    pub damping: f64,
    /// Per-node L1 tolerance; the stop criterion is `err < n * tolerance`
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: DEFAULT_DAMPING,
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Returns one rank per node, indexed by `NodeIndex::index()`.
///
/// Rank mass of nodes without outgoing edges is spread uniformly over all
/// nodes. If the iteration does not converge the last iterate is returned.
pub(crate) fn power_iteration<N, E>(graph: &DiGraph<N, E>, config: &PageRankConfig) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let uniform = 1.0 / n as f64;
    let out_degree: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.edges_directed(idx, Direction::Outgoing).count())
        .collect();

    let mut ranks = vec![uniform; n];
    for _ in 0..config.max_iterations {
        let previous = ranks;
        let dangling: f64 = previous
            .iter()
            .zip(&out_degree)
            .filter(|(_, deg)| **deg == 0)
            .map(|(rank, _)| rank)
            .sum();
        let base = config.damping * dangling * uniform + (1.0 - config.damping) * uniform;

        ranks = vec![base; n];
        for edge in graph.edge_references() {
            let from = edge.source().index();
            let to = edge.target().index();
            ranks[to] += config.damping * previous[from] / out_degree[from] as f64;
        }

        let err: f64 = ranks
            .iter()
            .zip(&previous)
            .map(|(a, b)| (a - b).abs())
            .sum();
        if err < n as f64 * config.tolerance {
            break;
        }
    }

    ranks
}
