//! Output module for run summaries
//!
//! This module handles:
//! - Tallying drained records per status
//! - Tracking which shards died abnormally
//! - Printing the end-of-run summary

pub mod stats;

pub use stats::{print_summary, RunSummary};
