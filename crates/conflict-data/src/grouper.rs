//! Partition of the flat transfer stream into per-block groups.

use std::collections::BTreeMap;

use crate::types::{BlockGroup, TransferRecord};

/// Group records by block number.
///
/// Produces exactly one group per distinct block, ordered by ascending block
/// number. Records keep their input order inside each group, so interleaved
/// or unsorted input still yields contiguous, non-duplicated groups.
pub fn group_by_block(records: Vec<TransferRecord>) -> Vec<BlockGroup> {
    let mut by_block: BTreeMap<u64, Vec<TransferRecord>> = BTreeMap::new();
    for record in records {
        by_block.entry(record.block_number).or_default().push(record);
    }

    by_block
        .into_iter()
        .map(|(block_number, records)| BlockGroup {
            block_number,
            records,
        })
        .collect()
}
