//! SQLite result store
//!
//! Only the supervisor writes to the database; shard processes never open it.

use crate::record::{FetchRecord, FetchStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ResultStore, StorageError, StorageResult};
use crate::storage::{ResultRow, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite result store backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Serializes the payload to JSON text, or NULL when the record has none
fn encode_payload(record: &FetchRecord) -> StorageResult<Option<String>> {
    record
        .payload()
        .map(serde_json::to_string)
        .transpose()
        .map_err(StorageError::from)
}

impl ResultStore for SqliteStore {
    fn create_run(&mut self, config_hash: &str, num_shards: u32) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, num_shards, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, num_shards, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, num_shards, status
                 FROM runs WHERE id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        num_shards: row.get(4)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                            .unwrap_or(RunStatus::Failed),
                    })
                },
            )
            .optional()?;

        run.ok_or(StorageError::RunNotFound(run_id))
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn insert_result(&mut self, run_id: i64, record: &FetchRecord) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO results (run_id, url, status, payload, received_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                record.url,
                record.status.to_string(),
                encode_payload(record)?,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_results(&self, run_id: i64) -> StorageResult<Vec<ResultRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, url, status, payload, received_at
             FROM results WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(ResultRow {
                    id: row.get(0)?,
                    run_id: row.get(1)?,
                    url: row.get(2)?,
                    status: row.get(3)?,
                    payload: row.get(4)?,
                    received_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn count_by_status(&self, run_id: i64, status: &FetchStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM results WHERE run_id = ?1 AND status = ?2",
            params![run_id, status.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_results(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM results WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
