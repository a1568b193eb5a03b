//! conflict-analysis crate
//!
//! Per-block conflict graphs over token transfers, depth statistics, and
//! node-count-weighted batch aggregation.

pub mod batch;
pub mod block_stats;
pub mod conflict_graph;
pub mod depth;
pub mod pipeline;

pub use pipeline::{run, PipelineConfig, PipelineOutput};
