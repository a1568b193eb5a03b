//! conflict-data crate
//!
//! Transfer-record ingestion, per-block grouping, and persistence/export of
//! token-conflict result tables.

pub mod export;
pub mod grouper;
pub mod ingest;
pub mod store;
pub mod types;

pub use types::{BatchMetrics, BlockGroup, BlockMetrics, TransferRecord};
