//! End-to-end transform from grouped transfers to the two result tables.

use conflict_data::types::{BatchMetrics, BlockGroup, BlockMetrics};
use eyre::{eyre, Result};
use tracing::info;

use crate::batch::{aggregate_batches, DEFAULT_BATCH_SIZE};
use crate::block_stats::{assemble_block_metrics, assemble_block_metrics_parallel};

/// Tuning knobs for a pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Block rows per weighted batch.
    pub batch_size: usize,
    /// Worker threads for per-block analysis; 0 uses every core, 1 stays on
    /// the calling thread.
    pub threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            threads: 0,
        }
    }
}

impl PipelineConfig {
    /// # Errors
    /// Returns error if `batch_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(eyre!("batch size must be at least 1"));
        }
        Ok(())
    }
}

/// Both result tables of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    /// One row per block, in input order.
    pub blocks: Vec<BlockMetrics>,
    /// One row per batch, in batch order.
    pub batches: Vec<BatchMetrics>,
}

/// Run block analysis and batch aggregation.
///
/// # Errors
/// Returns error if the config is invalid or the worker pool cannot start.
pub fn run(groups: &[BlockGroup], config: &PipelineConfig) -> Result<PipelineOutput> {
    run_with_progress(groups, config, || {})
}

/// [`run`], calling `on_block` after each block is analyzed.
///
/// # Errors
/// Returns error if the config is invalid or the worker pool cannot start.
pub fn run_with_progress<F>(
    groups: &[BlockGroup],
    config: &PipelineConfig,
    on_block: F,
) -> Result<PipelineOutput>
where
    F: Fn() + Sync,
{
    config.validate()?;

    let blocks = if config.threads == 1 {
        assemble_block_metrics(groups, &on_block)
    } else {
        assemble_block_metrics_parallel(groups, config.threads, &on_block)?
    };

    let batches = aggregate_batches(&blocks, config.batch_size);

    info!(
        blocks = blocks.len(),
        batches = batches.len(),
        batch_size = config.batch_size,
        "conflict pipeline finished"
    );
    Ok(PipelineOutput { blocks, batches })
}
