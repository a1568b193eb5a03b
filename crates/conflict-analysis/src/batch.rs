//! Node-count-weighted aggregation of block rows into fixed-size batches.
//!
//! Batching is by row position: rows `[k·size, (k+1)·size)` form batch `k`,
//! and the final batch may be shorter. Each block's ratios are weighted by
//! that block's node count, so large blocks dominate and empty blocks (whose
//! depth ratio is undefined) contribute nothing.

use conflict_data::types::{BatchMetrics, BlockMetrics};

/// Number of consecutive block rows per batch.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Running `Σ value·weight` and `Σ weight` for one weighted average.
#[derive(Clone, Copy, Debug, Default)]
struct WeightedSum {
    weighted: f64,
    weight: u64,
}

impl WeightedSum {
    /// Undefined values carry no weight; they only occur with zero nodes.
    fn add(&mut self, value: Option<f64>, weight: u64) {
        if let Some(value) = value {
            self.weighted += value * weight as f64;
        }
        self.weight += weight;
    }

    fn average(&self) -> Option<f64> {
        if self.weight == 0 {
            None
        } else {
            Some(self.weighted / self.weight as f64)
        }
    }
}

/// Aggregate one batch of rows.
pub fn aggregate_batch(batch_index: u64, rows: &[BlockMetrics]) -> BatchMetrics {
    let mut g1 = WeightedSum::default();
    let mut g2 = WeightedSum::default();
    let mut g1_single = WeightedSum::default();
    let mut g2_single = WeightedSum::default();

    for row in rows {
        g1.add(row.graph1_ratio, row.graph1_nodes);
        g2.add(row.graph2_ratio, row.graph2_nodes);
        g1_single.add(Some(row.graph1_single_ratio), row.graph1_nodes);
        g2_single.add(Some(row.graph2_single_ratio), row.graph2_nodes);
    }

    BatchMetrics {
        batch_index,
        graph1_weighted_avg: g1.average(),
        graph2_weighted_avg: g2.average(),
        graph1_single_weighted_avg: g1_single.average(),
        graph2_single_weighted_avg: g2_single.average(),
        total_nodes_g1: g1.weight,
        total_nodes_g2: g2.weight,
    }
}

/// Split `rows` into consecutive batches of `batch_size` and aggregate each.
///
/// # Panics
/// Panics if `batch_size` is zero; callers validate it through
/// [`crate::pipeline::PipelineConfig::validate`].
pub fn aggregate_batches(rows: &[BlockMetrics], batch_size: usize) -> Vec<BatchMetrics> {
    rows.chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| aggregate_batch(index as u64, chunk))
        .collect()
}
