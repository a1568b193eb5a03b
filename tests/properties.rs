//! Invariants that must hold for every block and every batch.

mod common;

use std::collections::HashSet;

use common::transfer;
use conflict_analysis::batch::aggregate_batches;
use conflict_analysis::block_stats::assemble_block_metrics;
use conflict_analysis::conflict_graph::build_conflict_graphs;
use conflict_analysis::depth::analyze;
use conflict_data::types::{BlockGroup, TransferRecord};
use proptest::prelude::*;

/// Transfers of one block over small hash, token and address pools, so
/// repeated transactions and shared addresses are common.
fn block_transfers(block: u64) -> impl Strategy<Value = Vec<TransferRecord>> {
    prop::collection::vec((0u8..6, 0u8..3, 0u8..5, 0u8..5), 0..30).prop_map(move |rows| {
        rows.into_iter()
            .map(|(tx, token, from, to)| {
                transfer(
                    block,
                    &format!("0x{block:x}{tx:02x}"),
                    &format!("0xtoken{token}"),
                    &format!("0xaddr{from}"),
                    &format!("0xaddr{to}"),
                )
            })
            .collect()
    })
}

/// Consecutive blocks, empty ones included.
fn block_stream() -> impl Strategy<Value = Vec<BlockGroup>> {
    prop::collection::vec(block_transfers(0), 0..60).prop_map(|blocks| {
        blocks
            .into_iter()
            .enumerate()
            .map(|(i, records)| {
                let block_number = 15_000_001 + i as u64;
                BlockGroup {
                    block_number,
                    records: records
                        .into_iter()
                        .map(|r| TransferRecord { block_number, ..r })
                        .collect(),
                }
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn chained_edges_are_a_subset_of_general_edges(records in block_transfers(15_000_001)) {
        let graphs = build_conflict_graphs(&records);
        let general: HashSet<(&str, &str)> = graphs.general.edge_pairs().into_iter().collect();

        for edge in graphs.chained.edge_pairs() {
            prop_assert!(general.contains(&edge), "chained edge {:?} missing from general graph", edge);
        }
        prop_assert!(graphs.chained.edge_count() <= graphs.general.edge_count());
    }

    #[test]
    fn node_count_equals_distinct_transactions(records in block_transfers(15_000_001)) {
        let distinct: HashSet<&str> = records.iter().map(|r| r.transaction_hash.as_str()).collect();

        let graphs = build_conflict_graphs(&records);
        prop_assert_eq!(graphs.general.node_count(), distinct.len());
        prop_assert_eq!(graphs.chained.node_count(), distinct.len());
    }

    #[test]
    fn ratio_and_depth_bounds(records in block_transfers(15_000_001)) {
        let graphs = build_conflict_graphs(&records);
        for graph in [&graphs.general, &graphs.chained] {
            let stats = analyze(graph);
            prop_assert!((0.0..=1.0).contains(&stats.edge_node_ratio));
            if stats.node_count == 0 {
                prop_assert_eq!(stats.max_depth, 0);
            } else {
                prop_assert!(stats.max_depth < stats.node_count);
            }
        }
    }

    #[test]
    fn batches_partition_block_rows_in_order(groups in block_stream(), batch_size in 1usize..25) {
        let rows = assemble_block_metrics(&groups, || {});
        let batches = aggregate_batches(&rows, batch_size);

        prop_assert_eq!(batches.len(), rows.len().div_ceil(batch_size));
        for (index, (batch, chunk)) in batches.iter().zip(rows.chunks(batch_size)).enumerate() {
            prop_assert_eq!(batch.batch_index, index as u64);

            let g1: u64 = chunk.iter().map(|r| r.graph1_nodes).sum();
            let g2: u64 = chunk.iter().map(|r| r.graph2_nodes).sum();
            prop_assert_eq!(batch.total_nodes_g1, g1);
            prop_assert_eq!(batch.total_nodes_g2, g2);

            let weighted: f64 = chunk
                .iter()
                .map(|r| r.graph1_ratio.unwrap_or(0.0) * r.graph1_nodes as f64)
                .sum();
            match batch.graph1_weighted_avg {
                Some(avg) => prop_assert!((avg - weighted / g1 as f64).abs() < 1e-9),
                None => prop_assert_eq!(g1, 0),
            }
        }

        let total: u64 = batches.iter().map(|b| b.total_nodes_g1).sum();
        let expected: u64 = rows.iter().map(|r| r.graph1_nodes).sum();
        prop_assert_eq!(total, expected);
    }

    #[test]
    fn one_block_batch_reproduces_block_ratios(groups in block_stream()) {
        let rows = assemble_block_metrics(&groups, || {});
        let batches = aggregate_batches(&rows, 1);
        prop_assert_eq!(batches.len(), rows.len());

        for (row, batch) in rows.iter().zip(&batches) {
            if row.graph1_nodes == 0 {
                prop_assert_eq!(row.graph1_ratio, None);
                prop_assert_eq!(batch.graph1_weighted_avg, None);
                prop_assert_eq!(batch.graph2_single_weighted_avg, None);
                continue;
            }
            let (Some(block_ratio), Some(avg)) = (row.graph1_ratio, batch.graph1_weighted_avg) else {
                panic!("non-empty block must have defined ratios");
            };
            prop_assert!((block_ratio - avg).abs() < 1e-12);
            let single = batch.graph2_single_weighted_avg.expect("defined for non-empty block");
            prop_assert!((row.graph2_single_ratio - single).abs() < 1e-12);
        }
    }
}
