//! Storage traits and error types

use crate::record::{FetchRecord, FetchStatus};
use crate::storage::{ResultRow, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for result store backends
pub trait ResultStore {
    /// Creates a new run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `num_shards` - Number of shards the run spawns
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, num_shards: u32) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Marks a run finished with `status` and a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Stores one drained record
    fn insert_result(&mut self, run_id: i64, record: &FetchRecord) -> StorageResult<i64>;

    /// Gets all results of a run in the order they were stored
    fn get_results(&self, run_id: i64) -> StorageResult<Vec<ResultRow>>;

    /// Counts results of a run with the given status
    fn count_by_status(&self, run_id: i64, status: &FetchStatus) -> StorageResult<u64>;

    /// Counts all results of a run
    fn count_results(&self, run_id: i64) -> StorageResult<u64>;
}
