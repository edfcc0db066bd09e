//! Storage module for persisting drained results
//!
//! This module handles the optional SQLite result store, including:
//! - Schema initialization
//! - Run tracking (config hash, shard count, start and finish times)
//! - One row per record drained by the supervisor

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{ResultStore, StorageError, StorageResult};

use std::path::Path;

/// Opens or creates a result store database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully opened store
/// * `Err(StorageError)` - Failed to open the database or create its schema
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::open(path)
}

/// Represents a run of the supervisor
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub num_shards: u32,
    pub status: RunStatus,
}

/// Represents one stored result
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub id: i64,
    pub run_id: i64,
    pub url: String,
    pub status: String,
    pub payload: Option<String>,
    pub received_at: String,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
