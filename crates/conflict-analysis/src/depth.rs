//! Depth statistics for a conflict graph.
//!
//! `max_depth` runs a depth-first search from every node that is still
//! unvisited, in node registration order, with a single visited set shared by
//! all roots. A node reached from an earlier root is never re-entered from a
//! later one, so the result is a lower bound on the longest path rather than
//! the longest path itself. Keep the shared set: per-root sets change results.

use petgraph::graph::NodeIndex;

use crate::conflict_graph::ConflictGraph;

/// Summary statistics of one conflict graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphStats {
    /// Distinct transactions, isolated ones included.
    pub node_count: usize,
    /// Deepest hop count reached by the shared-visited-set DFS.
    pub max_depth: usize,
    /// Fraction of nodes with at least one outgoing edge (0 for empty graphs).
    pub edge_node_ratio: f64,
}

/// Compute node count, max depth and edge-node ratio of `graph`.
pub fn analyze(graph: &ConflictGraph) -> GraphStats {
    GraphStats {
        node_count: graph.node_count(),
        max_depth: max_depth(graph),
        edge_node_ratio: edge_node_ratio(graph),
    }
}

/// Fraction of nodes that have at least one outgoing edge.
pub fn edge_node_ratio(graph: &ConflictGraph) -> f64 {
    let nodes = graph.node_count();
    if nodes == 0 {
        return 0.0;
    }
    let with_edges = graph
        .graph
        .node_indices()
        .filter(|&ix| graph.has_outgoing(ix))
        .count();
    with_edges as f64 / nodes as f64
}

/// Max DFS depth with one visited set shared across all roots.
///
/// Iterative equivalent of the recursive pre-order search: each frame keeps a
/// cursor into its node's successor list, and a successor is skipped if it is
/// already visited when the cursor reaches it.
pub fn max_depth(graph: &ConflictGraph) -> usize {
    let n = graph.node_count();
    let successors: Vec<Vec<NodeIndex>> = graph
        .graph
        .node_indices()
        .map(|ix| graph.successors(ix))
        .collect();

    let mut visited = vec![false; n];
    let mut deepest = 0_usize;
    // (node, depth, next successor position)
    let mut stack: Vec<(NodeIndex, usize, usize)> = Vec::new();

    for root in graph.graph.node_indices() {
        if visited[root.index()] {
            continue;
        }
        visited[root.index()] = true;
        stack.push((root, 0, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, depth, cursor) = *frame;
            let next = successors[node.index()][cursor..]
                .iter()
                .position(|succ| !visited[succ.index()]);

            match next {
                Some(offset) => {
                    let child = successors[node.index()][cursor + offset];
                    frame.2 = cursor + offset + 1;
                    visited[child.index()] = true;
                    deepest = deepest.max(depth + 1);
                    stack.push((child, depth + 1, 0));
                }
                None => {
                    stack.pop();
                }
            }
        }
    }

    deepest
}
