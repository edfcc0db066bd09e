//! Configuration module for Shard-Fetch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file (or no file at all) is a valid
//! configuration.
//!
//! # Example
//!
//! ```no_run
//! use shard_fetch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shard-fetch.toml")).unwrap();
//! println!("Running {} shards", config.shards.count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetchConfig, OutputConfig, ShardsConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate, validate_fetch_config};
