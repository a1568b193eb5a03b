//! CSV export of the per-block and per-batch result tables.
//!
//! The header is always written, so an empty run still yields a valid table.
//! Undefined ratios are written as empty fields.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use eyre::{Result, WrapErr};
use serde::Serialize;

use crate::types::{BatchMetrics, BlockMetrics};

/// Column order of the per-block table; matches [`BlockMetrics`] field order.
pub const BLOCK_COLUMNS: [&str; 9] = [
    "blockNumber",
    "graph1_nodes",
    "graph1_max_depth",
    "graph2_nodes",
    "graph2_max_depth",
    "graph1_single_ratio",
    "graph2_single_ratio",
    "graph1_ratio",
    "graph2_ratio",
];

/// Column order of the per-batch table; matches [`BatchMetrics`] field order.
pub const BATCH_COLUMNS: [&str; 7] = [
    "batch_index",
    "graph1_weighted_avg",
    "graph2_weighted_avg",
    "graph1_single_weighted_avg",
    "graph2_single_weighted_avg",
    "total_nodes_g1",
    "total_nodes_g2",
];

fn write_rows<W: Write, T: Serialize>(writer: W, columns: &[&str], rows: &[T]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer
        .write_record(columns)
        .wrap_err("failed to write CSV header")?;
    for row in rows {
        csv_writer
            .serialize(row)
            .wrap_err("failed to serialize CSV row")?;
    }
    csv_writer.flush().wrap_err("failed to flush CSV output")?;
    Ok(())
}

/// Write block rows as CSV to any writer.
///
/// # Errors
/// Returns error if serialization or the underlying write fails.
pub fn write_block_metrics_to<W: Write>(writer: W, rows: &[BlockMetrics]) -> Result<()> {
    write_rows(writer, &BLOCK_COLUMNS, rows)
}

/// Write batch rows as CSV to any writer.
///
/// # Errors
/// Returns error if serialization or the underlying write fails.
pub fn write_batch_metrics_to<W: Write>(writer: W, rows: &[BatchMetrics]) -> Result<()> {
    write_rows(writer, &BATCH_COLUMNS, rows)
}

/// Write the per-block table to `path`, replacing any existing file.
///
/// # Errors
/// Returns error if the file cannot be created or written.
pub fn write_block_metrics(path: &Path, rows: &[BlockMetrics]) -> Result<()> {
    let file =
        File::create(path).wrap_err_with(|| format!("failed to create {}", path.display()))?;
    write_block_metrics_to(file, rows)
        .wrap_err_with(|| format!("failed to write block metrics to {}", path.display()))
}

/// Write the per-batch table to `path`, replacing any existing file.
///
/// # Errors
/// Returns error if the file cannot be created or written.
pub fn write_batch_metrics(path: &Path, rows: &[BatchMetrics]) -> Result<()> {
    let file =
        File::create(path).wrap_err_with(|| format!("failed to create {}", path.display()))?;
    write_batch_metrics_to(file, rows)
        .wrap_err_with(|| format!("failed to write batch metrics to {}", path.display()))
}
