//! Conflict graph construction for the transfers of a single block.
//!
//! Nodes are transaction hashes. An edge `a → b` records that a transfer of
//! `a` and a later transfer of `b` move the same token and share a sender or
//! receiver address. Two graphs are built side by side:
//!
//! - the **general** graph keeps every such overlap;
//! - the **chained** graph keeps only head-to-tail overlaps, where the later
//!   transfer starts at the earlier one's recipient or ends at its sender.
//!
//! Every chained edge is also a general edge. Parallel edges between the same
//! pair are kept, as a transaction may emit several conflicting transfers.

use std::collections::HashMap;

use conflict_data::types::TransferRecord;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

/// Directed conflict graph over the transactions of one block.
#[derive(Debug, Clone, Default)]
pub struct ConflictGraph {
    /// The underlying petgraph directed graph (node weight = tx hash).
    pub graph: DiGraph<String, ()>,
    /// Lookup from transaction hash to node index.
    pub hash_to_ix: HashMap<String, NodeIndex>,
}

impl ConflictGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transaction; returns its existing index if already present.
    ///
    /// Node indices follow first-registration order, which is the root order
    /// used by [`crate::depth::max_depth`].
    pub fn add_node(&mut self, hash: &str) -> NodeIndex {
        if let Some(&ix) = self.hash_to_ix.get(hash) {
            return ix;
        }
        let ix = self.graph.add_node(hash.to_string());
        self.hash_to_ix.insert(hash.to_string(), ix);
        ix
    }

    /// Add a conflict edge, registering both endpoints first.
    ///
    /// Uses `add_edge` (not `update_edge`) so parallel edges are preserved.
    pub fn add_edge(&mut self, from_hash: &str, to_hash: &str) {
        let a = self.add_node(from_hash);
        let b = self.add_node(to_hash);
        self.graph.add_edge(a, b, ());
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Successors of `node` in edge-insertion order, duplicates included.
    ///
    /// petgraph walks a node's edge list newest-first, so the collected list
    /// is reversed.
    pub fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        out.reverse();
        out
    }

    /// Whether `node` has at least one outgoing edge.
    pub fn has_outgoing(&self, node: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .next()
            .is_some()
    }

    /// Edges as `(source hash, target hash)` pairs in insertion order.
    pub fn edge_pairs(&self) -> Vec<(&str, &str)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| {
                (
                    self.graph[e.source()].as_str(),
                    self.graph[e.target()].as_str(),
                )
            })
            .collect()
    }
}

/// The two conflict graphs of one block, over the same node set.
#[derive(Debug, Clone, Default)]
pub struct ConflictGraphs {
    /// Shared token and any shared sender/receiver address.
    pub general: ConflictGraph,
    /// Shared token and a head-to-tail address chain.
    pub chained: ConflictGraph,
}

/// Any of `later`'s endpoints equals any of `earlier`'s endpoints.
fn shares_address(earlier: &TransferRecord, later: &TransferRecord) -> bool {
    later.from == earlier.from
        || later.from == earlier.to
        || later.to == earlier.to
        || later.to == earlier.from
}

/// `later` starts where `earlier` ends, or ends where `earlier` starts.
fn chains_onto(earlier: &TransferRecord, later: &TransferRecord) -> bool {
    later.from == earlier.to || later.to == earlier.from
}

/// Build the general and chained conflict graphs for one block.
///
/// Every pair of records `i < j` from different transactions is compared once
/// (O(n²) in the block's transfer count). An empty block yields two empty
/// graphs.
pub fn build_conflict_graphs(records: &[TransferRecord]) -> ConflictGraphs {
    let mut graphs = ConflictGraphs::default();

    for (i, earlier) in records.iter().enumerate() {
        graphs.general.add_node(&earlier.transaction_hash);
        graphs.chained.add_node(&earlier.transaction_hash);

        for later in &records[i + 1..] {
            if earlier.transaction_hash == later.transaction_hash {
                continue;
            }
            if earlier.token_address != later.token_address || !shares_address(earlier, later) {
                continue;
            }

            graphs
                .general
                .add_edge(&earlier.transaction_hash, &later.transaction_hash);
            if chains_onto(earlier, later) {
                graphs
                    .chained
                    .add_edge(&earlier.transaction_hash, &later.transaction_hash);
            }
        }
    }

    graphs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(hash: &str, token: &str, from: &str, to: &str) -> TransferRecord {
        TransferRecord {
            block_number: 1,
            transaction_hash: hash.to_string(),
            token_address: token.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn head_to_tail_transfer_is_chained() {
        let records = vec![
            rec("A", "T", "X", "Y"),
            rec("B", "T", "Y", "Z"),
            rec("C", "T", "W", "V"),
        ];

        let graphs = build_conflict_graphs(&records);
        assert_eq!(graphs.general.node_count(), 3);
        assert_eq!(graphs.chained.node_count(), 3);
        assert_eq!(graphs.general.edge_pairs(), vec![("A", "B")]);
        assert_eq!(graphs.chained.edge_pairs(), vec![("A", "B")]);
    }

    #[test]
    fn shared_sender_is_general_only() {
        // Both transfers leave X: a conflict, but not a chain.
        let records = vec![rec("A", "T", "X", "Y"), rec("B", "T", "X", "Z")];

        let graphs = build_conflict_graphs(&records);
        assert_eq!(graphs.general.edge_pairs(), vec![("A", "B")]);
        assert_eq!(graphs.chained.edge_count(), 0);
        assert_eq!(graphs.chained.node_count(), 2);
    }

    #[test]
    fn different_tokens_never_conflict() {
        let records = vec![rec("A", "T1", "X", "Y"), rec("B", "T2", "Y", "X")];

        let graphs = build_conflict_graphs(&records);
        assert_eq!(graphs.general.edge_count(), 0);
        assert_eq!(graphs.general.node_count(), 2);
    }

    #[test]
    fn same_transaction_transfers_share_one_node() {
        let records = vec![
            rec("A", "T", "X", "Y"),
            rec("A", "T", "Y", "Z"),
            rec("B", "T", "Z", "Q"),
        ];

        let graphs = build_conflict_graphs(&records);
        assert_eq!(graphs.general.node_count(), 2);
        // Only the second transfer of A touches B's address Z.
        assert_eq!(graphs.general.edge_pairs(), vec![("A", "B")]);
    }

    #[test]
    fn parallel_edges_are_kept() {
        let records = vec![
            rec("A", "T", "X", "Y"),
            rec("A", "T", "X", "W"),
            rec("B", "T", "Y", "W"),
        ];

        let graphs = build_conflict_graphs(&records);
        assert_eq!(graphs.general.edge_pairs(), vec![("A", "B"), ("A", "B")]);
    }

    #[test]
    fn edge_registration_sets_node_order() {
        // B is first mentioned as the target of A's edge, before C is seen.
        let records = vec![
            rec("A", "T", "X", "Y"),
            rec("C", "U", "P", "Q"),
            rec("B", "T", "Y", "Z"),
        ];

        let graphs = build_conflict_graphs(&records);
        let order: Vec<&str> = graphs
            .general
            .graph
            .node_indices()
            .map(|ix| graphs.general.graph[ix].as_str())
            .collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn successors_follow_insertion_order() {
        let mut graph = ConflictGraph::new();
        graph.add_edge("A", "B");
        graph.add_edge("A", "C");
        graph.add_edge("A", "D");

        let a = graph.hash_to_ix["A"];
        let names: Vec<&str> = graph
            .successors(a)
            .into_iter()
            .map(|ix| graph.graph[ix].as_str())
            .collect();
        assert_eq!(names, vec!["B", "C", "D"]);
    }

    #[test]
    fn empty_block_yields_empty_graphs() {
        let graphs = build_conflict_graphs(&[]);
        assert_eq!(graphs.general.node_count(), 0);
        assert_eq!(graphs.general.edge_count(), 0);
        assert_eq!(graphs.chained.node_count(), 0);
        assert_eq!(graphs.chained.edge_count(), 0);
    }
}
