//! Shard-Fetch: a coordination-free sharded document fetcher
//!
//! This crate pulls URLs from a provider, lets each of a fixed number of
//! shards decide on its own which URLs it owns, fetches them under global and
//! per-host concurrency caps, runs a pluggable content interpreter over each
//! successful response and hands one result record per URL to a sink.

pub mod config;
pub mod interpreter;
pub mod output;
pub mod provider;
pub mod record;
pub mod shard;
pub mod sink;
pub mod storage;
pub mod supervisor;

use thiserror::Error;

/// Main error type for Shard-Fetch operations
#[derive(Debug, Error)]
pub enum ShardError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL provider error: {0}")]
    Provider(#[from] provider::ProviderError),

    #[error("Result sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Unclassified failure while fetching {url}: {message}")]
    Unclassified { url: String, message: String },

    #[error("Invalid shard id {id} for {num_shards} shards")]
    InvalidShard { id: u32, num_shards: u32 },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: shard::ShardState,
        to: shard::ShardState,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shard {id} could not be spawned: {message}")]
    Spawn { id: u32, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Shard-Fetch operations
pub type Result<T> = std::result::Result<T, ShardError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use record::{FetchRecord, FetchStatus, Payload};
pub use shard::{owns, Shard, ShardState};
