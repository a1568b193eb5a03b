//! Per-block conflict statistics.
//!
//! Builds both conflict graphs for each block, analyzes them, and assembles
//! one [`BlockMetrics`] row per block. Graphs are dropped as soon as the row
//! is produced, so peak memory follows the largest block.

use conflict_data::types::{BlockGroup, BlockMetrics};
use eyre::{Result, WrapErr};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::conflict_graph::build_conflict_graphs;
use crate::depth::analyze;

/// `max_depth / node_count`, or `None` for an empty graph.
pub fn depth_ratio(max_depth: usize, node_count: usize) -> Option<f64> {
    if node_count == 0 {
        None
    } else {
        Some(max_depth as f64 / node_count as f64)
    }
}

/// Build, analyze and summarize one block.
pub fn compute_block_metrics(group: &BlockGroup) -> BlockMetrics {
    let graphs = build_conflict_graphs(&group.records);
    let general = analyze(&graphs.general);
    let chained = analyze(&graphs.chained);

    debug!(
        block = group.block_number,
        transfers = group.records.len(),
        nodes = general.node_count,
        general_edges = graphs.general.edge_count(),
        chained_edges = graphs.chained.edge_count(),
        general_depth = general.max_depth,
        chained_depth = chained.max_depth,
        "block analyzed"
    );

    BlockMetrics {
        block_number: group.block_number,
        graph1_nodes: general.node_count as u64,
        graph1_max_depth: general.max_depth as u64,
        graph2_nodes: chained.node_count as u64,
        graph2_max_depth: chained.max_depth as u64,
        graph1_single_ratio: general.edge_node_ratio,
        graph2_single_ratio: chained.edge_node_ratio,
        graph1_ratio: depth_ratio(general.max_depth, general.node_count),
        graph2_ratio: depth_ratio(chained.max_depth, chained.node_count),
    }
}

/// Compute one row per block, in input order, on the calling thread.
///
/// `on_block` is called once per finished block.
pub fn assemble_block_metrics<F>(groups: &[BlockGroup], on_block: F) -> Vec<BlockMetrics>
where
    F: Fn(),
{
    let rows: Vec<BlockMetrics> = groups
        .iter()
        .map(|group| {
            let row = compute_block_metrics(group);
            on_block();
            row
        })
        .collect();

    info!(blocks = rows.len(), threads = 1, "block metrics assembled");
    rows
}

/// Compute one row per block on a dedicated rayon pool.
///
/// Rows are collected by position, so the output order equals the input
/// order for any thread count. `on_block` is called once per finished block,
/// from whichever worker finished it.
///
/// # Errors
/// Returns error if the thread pool cannot be created.
pub fn assemble_block_metrics_parallel<F>(
    groups: &[BlockGroup],
    threads: usize,
    on_block: F,
) -> Result<Vec<BlockMetrics>>
where
    F: Fn() + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .wrap_err("failed to build block analysis thread pool")?;

    let rows: Vec<BlockMetrics> = pool.install(|| {
        groups
            .par_iter()
            .map(|group| {
                let row = compute_block_metrics(group);
                on_block();
                row
            })
            .collect()
    });

    info!(
        blocks = rows.len(),
        threads = pool.current_num_threads(),
        "block metrics assembled"
    );
    Ok(rows)
}
