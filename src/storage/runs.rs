//! Crawl run log
//!
//! Runs are recorded outside the ingestion transaction so a failed run stays
//! visible after its batch has been rolled back.

use crate::storage::{Database, RunRecord, RunStatus, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

const RUN_COLUMNS: &str = "run_id, domain_id, seed_url, status, started_at, lock_acquired_at,
                           finished_at, pages_ingested, error_message";

fn map_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        domain_id: row.get(1)?,
        seed_url: row.get(2)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(3)?).unwrap_or(RunStatus::Failed),
        started_at: row.get(4)?,
        lock_acquired_at: row.get(5)?,
        finished_at: row.get(6)?,
        pages_ingested: row.get(7)?,
        error_message: row.get(8)?,
    })
}

/// Persistent log of crawl runs
#[derive(Clone)]
pub struct RunStore {
    db: Database,
}

impl RunStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates a new running crawl run
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    pub fn start(&self, domain_id: i64, seed_url: &str) -> StorageResult<i64> {
        let now = Utc::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO crawl_runs (domain_id, seed_url, status, started_at) VALUES (?1, ?2, ?3, ?4)",
                params![domain_id, seed_url, RunStatus::Running.to_db_string(), now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Records the moment the run took the per-domain ingestion lock
    pub fn mark_lock_acquired(&self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now();
        self.update(
            run_id,
            "UPDATE crawl_runs SET lock_acquired_at = ?1 WHERE run_id = ?2",
            params![now, run_id],
        )
    }

    /// Marks a run as completed with a finish timestamp
    pub fn complete(&self, run_id: i64, pages_ingested: u32) -> StorageResult<()> {
        let now = Utc::now();
        self.update(
            run_id,
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, pages_ingested = ?3 WHERE run_id = ?4",
            params![RunStatus::Completed.to_db_string(), now, pages_ingested, run_id],
        )
    }

    /// Marks a run as failed, keeping the error message
    pub fn fail(&self, run_id: i64, error_message: &str) -> StorageResult<()> {
        let now = Utc::now();
        self.update(
            run_id,
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE run_id = ?4",
            params![RunStatus::Failed.to_db_string(), now, error_message, run_id],
        )
    }

    fn update(&self, run_id: i64, sql: &str, params: &[&dyn rusqlite::ToSql]) -> StorageResult<()> {
        let changed = self.db.with_conn(|conn| Ok(conn.execute(sql, params)?))?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Gets a run by ID
    pub fn get(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {} FROM crawl_runs WHERE run_id = ?1", RUN_COLUMNS);
            conn.prepare_cached(&sql)?
                .query_row(params![run_id], map_run)
                .optional()?
                .ok_or(StorageError::RunNotFound(run_id))
        })
    }

    /// Lists a domain's runs, oldest first
    pub fn list_for_domain(&self, domain_id: i64) -> StorageResult<Vec<RunRecord>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM crawl_runs WHERE domain_id = ?1 ORDER BY run_id",
                RUN_COLUMNS
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let runs = stmt
                .query_map(params![domain_id], map_run)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(runs)
        })
    }
}
