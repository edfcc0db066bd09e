//! Run statistics collected while draining records

use crate::record::{FetchRecord, FetchStatus};
use crate::supervisor::ShardExit;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Summary of one supervisor run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// When the supervisor started the shards
    pub started_at: DateTime<Utc>,

    /// When the last record was drained
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of shards spawned
    pub num_shards: u32,

    /// Total records received
    pub total: u64,

    /// Count of records by status
    pub by_status: HashMap<FetchStatus, u64>,

    /// Shards that did not exit cleanly
    pub failed_shards: Vec<u32>,
}

impl RunSummary {
    pub fn new(num_shards: u32) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            num_shards,
            total: 0,
            by_status: HashMap::new(),
            failed_shards: Vec::new(),
        }
    }

    /// Counts one drained record
    pub fn record(&mut self, record: &FetchRecord) {
        self.total += 1;
        *self.by_status.entry(record.status.clone()).or_insert(0) += 1;
    }

    /// Records how the shards ended and stamps the finish time
    pub fn finish(&mut self, exits: &[ShardExit]) {
        self.failed_shards = exits
            .iter()
            .filter(|exit| exit.failed())
            .map(|exit| exit.id)
            .collect();
        self.failed_shards.sort_unstable();
        self.finished_at = Some(Utc::now());
    }

    pub fn count(&self, status: &FetchStatus) -> u64 {
        self.by_status.get(status).copied().unwrap_or(0)
    }

    /// Returns true if every shard exited cleanly
    pub fn is_success(&self) -> bool {
        self.failed_shards.is_empty()
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints a run summary to stdout
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &RunSummary) {
    println!("=== Run Summary ===\n");

    println!("Overview:");
    println!("  Shards: {}", summary.num_shards);
    println!("  Results received: {}", summary.total);
    if let Some(seconds) = summary.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    println!();

    println!("Results by Status:");
    let mut status_counts: Vec<_> = summary.by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));

    for (status, count) in status_counts {
        let percentage = if summary.total > 0 {
            (*count as f64 / summary.total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !summary.failed_shards.is_empty() {
        println!("Failed Shards ({}):", summary.failed_shards.len());
        for id in &summary.failed_shards {
            println!("  - shard {}", id);
        }
        println!();
    }

    let ok = summary.count(&FetchStatus::Ok);
    let success_rate = if summary.total > 0 {
        (ok as f64 / summary.total as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} URLs interpreted)",
        success_rate, ok, summary.total
    );
}
