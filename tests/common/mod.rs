//! Shared test helpers and utilities.
//!
//! Provides factory functions for transfer records and on-disk CSV fixtures.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use conflict_data::store::Store;
use conflict_data::types::TransferRecord;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// CSV header used by the transfer exports.
pub const TRANSFER_HEADER: &str = "blockNumber,transactionHash,tokenAddress,from,to";

/// Creates an in-memory SQLite Store for tests.
///
/// # Panics
/// Panics if the in-memory database cannot be created (should never happen).
pub fn test_store() -> Store {
    Store::new(":memory:").expect("in-memory store should always open")
}

/// Creates a transfer record with short symbolic fields.
///
/// # Example
/// ```ignore
/// let r = transfer(15_000_001, "A", "T", "X", "Y");
/// assert_eq!(r.from, "X");
/// ```
pub fn transfer(block: u64, hash: &str, token: &str, from: &str, to: &str) -> TransferRecord {
    TransferRecord {
        block_number: block,
        transaction_hash: hash.to_string(),
        token_address: token.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Seeded pseudo-random block stream, one to forty transfers per block.
///
/// Addresses and tokens are drawn from small pools so conflicts are frequent.
pub fn synthetic_records(blocks: u64, seed: u64) -> Vec<TransferRecord> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut records = Vec::new();
    for b in 0..blocks {
        let block = 15_000_001 + b;
        let transfers: u64 = rng.gen_range(1..=40);
        for i in 0..transfers {
            // Roughly one in four transfers reuses the previous transaction.
            let tx = if i > 0 && rng.gen_ratio(1, 4) { i - 1 } else { i };
            records.push(transfer(
                block,
                &format!("0x{block:x}{tx:04x}"),
                &format!("0xtoken{}", rng.gen_range(0..3)),
                &format!("0xaddr{}", rng.gen_range(0..8)),
                &format!("0xaddr{}", rng.gen_range(0..8)),
            ));
        }
    }
    records
}

/// Writes records as a transfer CSV export inside `dir`.
pub fn write_transfer_csv(
    dir: &tempfile::TempDir,
    name: &str,
    records: &[TransferRecord],
) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("fixture file should be creatable");
    writeln!(file, "{TRANSFER_HEADER}").expect("header write should succeed");
    for r in records {
        writeln!(
            file,
            "{},{},{},{},{}",
            r.block_number, r.transaction_hash, r.token_address, r.from, r.to
        )
        .expect("row write should succeed");
    }
    path
}
