//! SQLite storage for analysis runs and their result tables.
//!
//! Uses WAL mode and prepared statements inside a transaction for batch
//! inserts. Undefined ratios are stored as `NULL`.

use std::cell::RefCell;

use chrono::Utc;
use eyre::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::types::{BatchMetrics, BlockMetrics};

/// A stored analysis run.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRun {
    pub id: i64,
    /// RFC 3339 creation time (UTC).
    pub created_at: String,
    /// Input CSV paths joined with `;`.
    pub input_files: String,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    pub batch_size: u64,
    pub block_count: u64,
    pub batch_count: u64,
}

/// Parameters describing a run about to be inserted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewRun {
    pub input_files: Vec<String>,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    pub batch_size: u64,
    pub block_count: u64,
    pub batch_count: u64,
}

pub struct Store {
    conn: RefCell<Connection>,
}

impl Store {
    /// Creates or opens a SQLite database with WAL mode enabled.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrations fail.
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn: RefCell::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn.borrow_mut().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS analysis_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT,
                input_files TEXT,
                start_block INTEGER,
                end_block INTEGER,
                batch_size INTEGER,
                block_count INTEGER,
                batch_count INTEGER
            );

            CREATE TABLE IF NOT EXISTS block_metrics (
                run_id INTEGER REFERENCES analysis_runs(id),
                position INTEGER,
                block_number INTEGER,
                graph1_nodes INTEGER,
                graph1_max_depth INTEGER,
                graph2_nodes INTEGER,
                graph2_max_depth INTEGER,
                graph1_single_ratio REAL,
                graph2_single_ratio REAL,
                graph1_ratio REAL,
                graph2_ratio REAL,
                PRIMARY KEY (run_id, position)
            );

            CREATE TABLE IF NOT EXISTS batch_metrics (
                run_id INTEGER REFERENCES analysis_runs(id),
                batch_index INTEGER,
                graph1_weighted_avg REAL,
                graph2_weighted_avg REAL,
                graph1_single_weighted_avg REAL,
                graph2_single_weighted_avg REAL,
                total_nodes_g1 INTEGER,
                total_nodes_g2 INTEGER,
                PRIMARY KEY (run_id, batch_index)
            );
            ",
        )?;
        Ok(())
    }

    /// Insert a run header and return its id.
    ///
    /// # Errors
    /// Returns error if database insert fails.
    pub fn insert_run(&self, run: &NewRun) -> Result<i64> {
        let conn = self.conn.borrow();
        conn.execute(
            "
            INSERT INTO analysis_runs (
                created_at, input_files, start_block, end_block,
                batch_size, block_count, batch_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            rusqlite::params![
                Utc::now().to_rfc3339(),
                run.input_files.join(";"),
                run.start_block,
                run.end_block,
                run.batch_size,
                run.block_count,
                run.batch_count,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Batch insert block rows for a run, preserving their order.
    ///
    /// # Errors
    /// Returns error if database insert fails.
    pub fn insert_block_metrics(&self, run_id: i64, rows: &[BlockMetrics]) -> Result<usize> {
        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO block_metrics (
                    run_id, position, block_number, graph1_nodes, graph1_max_depth,
                    graph2_nodes, graph2_max_depth, graph1_single_ratio,
                    graph2_single_ratio, graph1_ratio, graph2_ratio
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )?;

            for (position, m) in rows.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    run_id,
                    position as i64,
                    m.block_number,
                    m.graph1_nodes,
                    m.graph1_max_depth,
                    m.graph2_nodes,
                    m.graph2_max_depth,
                    m.graph1_single_ratio,
                    m.graph2_single_ratio,
                    m.graph1_ratio,
                    m.graph2_ratio,
                ])?;
            }
        }

        let count = rows.len();
        tx.commit()?;
        Ok(count)
    }

    /// Batch insert batch rows for a run.
    ///
    /// # Errors
    /// Returns error if database insert fails.
    pub fn insert_batch_metrics(&self, run_id: i64, rows: &[BatchMetrics]) -> Result<usize> {
        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO batch_metrics (
                    run_id, batch_index, graph1_weighted_avg, graph2_weighted_avg,
                    graph1_single_weighted_avg, graph2_single_weighted_avg,
                    total_nodes_g1, total_nodes_g2
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )?;

            for b in rows {
                stmt.execute(rusqlite::params![
                    run_id,
                    b.batch_index,
                    b.graph1_weighted_avg,
                    b.graph2_weighted_avg,
                    b.graph1_single_weighted_avg,
                    b.graph2_single_weighted_avg,
                    b.total_nodes_g1,
                    b.total_nodes_g2,
                ])?;
            }
        }

        let count = rows.len();
        tx.commit()?;
        Ok(count)
    }

    /// Most recently inserted run, if any.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn latest_run(&self) -> Result<Option<AnalysisRun>> {
        let conn = self.conn.borrow();
        let run = conn
            .query_row(
                "SELECT id, created_at, input_files, start_block, end_block,
                        batch_size, block_count, batch_count
                 FROM analysis_runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// Run by id, if present.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_run(&self, run_id: i64) -> Result<Option<AnalysisRun>> {
        let conn = self.conn.borrow();
        let run = conn
            .query_row(
                "SELECT id, created_at, input_files, start_block, end_block,
                        batch_size, block_count, batch_count
                 FROM analysis_runs WHERE id = ?",
                rusqlite::params![run_id],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// All runs, oldest first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list_runs(&self) -> Result<Vec<AnalysisRun>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT id, created_at, input_files, start_block, end_block,
                    batch_size, block_count, batch_count
             FROM analysis_runs ORDER BY id",
        )?;
        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// Block rows of a run in insertion order.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_block_metrics(&self, run_id: i64) -> Result<Vec<BlockMetrics>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT block_number, graph1_nodes, graph1_max_depth, graph2_nodes,
                    graph2_max_depth, graph1_single_ratio, graph2_single_ratio,
                    graph1_ratio, graph2_ratio
             FROM block_metrics WHERE run_id = ? ORDER BY position",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![run_id], |row| {
                Ok(BlockMetrics {
                    block_number: row.get(0)?,
                    graph1_nodes: row.get(1)?,
                    graph1_max_depth: row.get(2)?,
                    graph2_nodes: row.get(3)?,
                    graph2_max_depth: row.get(4)?,
                    graph1_single_ratio: row.get(5)?,
                    graph2_single_ratio: row.get(6)?,
                    graph1_ratio: row.get(7)?,
                    graph2_ratio: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Batch rows of a run in batch order.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_batch_metrics(&self, run_id: i64) -> Result<Vec<BatchMetrics>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT batch_index, graph1_weighted_avg, graph2_weighted_avg,
                    graph1_single_weighted_avg, graph2_single_weighted_avg,
                    total_nodes_g1, total_nodes_g2
             FROM batch_metrics WHERE run_id = ? ORDER BY batch_index",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![run_id], |row| {
                Ok(BatchMetrics {
                    batch_index: row.get(0)?,
                    graph1_weighted_avg: row.get(1)?,
                    graph2_weighted_avg: row.get(2)?,
                    graph1_single_weighted_avg: row.get(3)?,
                    graph2_single_weighted_avg: row.get(4)?,
                    total_nodes_g1: row.get(5)?,
                    total_nodes_g2: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<AnalysisRun> {
    Ok(AnalysisRun {
        id: row.get(0)?,
        created_at: row.get(1)?,
        input_files: row.get(2)?,
        start_block: row.get(3)?,
        end_block: row.get(4)?,
        batch_size: row.get(5)?,
        block_count: row.get(6)?,
        batch_count: row.get(7)?,
    })
}
