//! Type definitions for token-conflict records and result rows.
//!
//! Ratios that cannot be computed (zero nodes, zero batch weight) are
//! `None`. That single undefined value is carried through every output:
//! an empty CSV field, JSON `null`, and SQLite `NULL`.

use serde::{Deserialize, Serialize};

/// One token transfer, as exported per ERC-20/ERC-721 Transfer event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Block containing the transfer.
    #[serde(rename = "blockNumber")]
    pub block_number: u64,
    /// Hash of the transaction that emitted the transfer (hex text).
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    /// Token contract address (hex text).
    #[serde(rename = "tokenAddress")]
    pub token_address: String,
    /// Sender address (hex text).
    pub from: String,
    /// Recipient address (hex text).
    pub to: String,
}

/// All transfers of one block, in input order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockGroup {
    /// Block number shared by every record.
    pub block_number: u64,
    /// Records of the block.
    pub records: Vec<TransferRecord>,
}

/// Per-block conflict statistics.
///
/// `graph1` is the general-conflict graph, `graph2` the chained-conflict graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockMetrics {
    /// Block number.
    #[serde(rename = "blockNumber")]
    pub block_number: u64,
    /// Distinct transactions in the general-conflict graph.
    pub graph1_nodes: u64,
    /// Max traversal depth of the general-conflict graph.
    pub graph1_max_depth: u64,
    /// Distinct transactions in the chained-conflict graph.
    pub graph2_nodes: u64,
    /// Max traversal depth of the chained-conflict graph.
    pub graph2_max_depth: u64,
    /// Fraction of general-graph nodes with an outgoing edge.
    pub graph1_single_ratio: f64,
    /// Fraction of chained-graph nodes with an outgoing edge.
    pub graph2_single_ratio: f64,
    /// `graph1_max_depth / graph1_nodes`.
    pub graph1_ratio: Option<f64>,
    /// `graph2_max_depth / graph2_nodes`.
    pub graph2_ratio: Option<f64>,
}

/// Node-count-weighted averages over one contiguous run of blocks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchMetrics {
    /// Zero-based position of the batch.
    pub batch_index: u64,
    /// Weighted average of `graph1_ratio`.
    pub graph1_weighted_avg: Option<f64>,
    /// Weighted average of `graph2_ratio`.
    pub graph2_weighted_avg: Option<f64>,
    /// Weighted average of `graph1_single_ratio`.
    pub graph1_single_weighted_avg: Option<f64>,
    /// Weighted average of `graph2_single_ratio`.
    pub graph2_single_weighted_avg: Option<f64>,
    /// Sum of `graph1_nodes` in the batch.
    pub total_nodes_g1: u64,
    /// Sum of `graph2_nodes` in the batch.
    pub total_nodes_g2: u64,
}
