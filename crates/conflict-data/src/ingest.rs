//! CSV ingestion of token-transfer exports.
//!
//! Reads one or more transfer exports (ERC-20 and ERC-721 exports share the
//! same columns), concatenates them in argument order and keeps the records
//! that fall inside an inclusive block range. Columns other than
//! `blockNumber, transactionHash, tokenAddress, from, to` are ignored.

use std::fs::File;
use std::path::Path;

use eyre::{eyre, Result, WrapErr};
use tracing::{debug, info};

use crate::types::TransferRecord;

/// Inclusive block-number range. Open ends accept everything on that side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockRange {
    /// Lowest accepted block number.
    pub start: Option<u64>,
    /// Highest accepted block number.
    pub end: Option<u64>,
}

impl BlockRange {
    pub fn new(start: Option<u64>, end: Option<u64>) -> Self {
        Self { start, end }
    }

    /// Range that accepts every block.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Rejects ranges whose start lies after their end.
    ///
    /// # Errors
    /// Returns error when both ends are set and `start > end`.
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(eyre!(
                    "invalid range: start-block {start} is greater than end-block {end}"
                ));
            }
        }
        Ok(())
    }

    pub fn contains(&self, block_number: u64) -> bool {
        self.start.map_or(true, |start| block_number >= start)
            && self.end.map_or(true, |end| block_number <= end)
    }
}

/// Load every transfer record from a single CSV export.
///
/// # Errors
/// Returns error if the file cannot be opened or any row is malformed.
pub fn load_transfer_csv(path: &Path) -> Result<Vec<TransferRecord>> {
    let file =
        File::open(path).wrap_err_with(|| format!("failed to open {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<TransferRecord>().enumerate() {
        // Header is line 1, so data row `row` sits on line `row + 2`.
        let record = result.wrap_err_with(|| {
            format!("malformed transfer record in {} at line {}", path.display(), row + 2)
        })?;
        records.push(record);
    }

    debug!(file = %path.display(), rows = records.len(), "loaded transfer export");
    Ok(records)
}

/// Load and concatenate several exports, keeping records inside `range`.
///
/// # Errors
/// Returns error if no path is given, the range is invalid, or any file
/// fails to load.
pub fn load_transfer_files<P: AsRef<Path>>(
    paths: &[P],
    range: BlockRange,
) -> Result<Vec<TransferRecord>> {
    if paths.is_empty() {
        return Err(eyre!("at least one transfer CSV path is required"));
    }
    range.validate()?;

    let mut records = Vec::new();
    let mut loaded = 0_usize;
    for path in paths {
        let file_records = load_transfer_csv(path.as_ref())?;
        loaded += file_records.len();
        records.extend(
            file_records
                .into_iter()
                .filter(|record| range.contains(record.block_number)),
        );
    }

    info!(
        files = paths.len(),
        loaded,
        kept = records.len(),
        start_block = ?range.start,
        end_block = ?range.end,
        "transfer records loaded"
    );
    Ok(records)
}
