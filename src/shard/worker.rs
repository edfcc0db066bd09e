//! Worker pool
//!
//! A shard runs W worker units as futures multiplexed on one task. Each unit
//! pulls a batch from the shared poller, drops the URLs its shard does not
//! own and processes the rest one after another before pulling again.
//! Concurrency comes from the units interleaving while they wait on the
//! network, never from parallel pulls.

use crate::interpreter::ContentInterpreter;
use crate::provider::UrlProvider;
use crate::record::FetchStatus;
use crate::shard::partition::Assignment;
use crate::shard::pipeline::FetchPipeline;
use crate::shard::poller::BatchPoller;
use crate::sink::ResultSink;
use crate::ShardError;
use futures::future::try_join_all;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the worker units of one shard
#[derive(Debug, Default)]
pub struct WorkerStats {
    batches: AtomicU64,
    skipped: AtomicU64,
    ok: AtomicU64,
    http_errors: AtomicU64,
    network_errors: AtomicU64,
    other: AtomicU64,
}

/// Totals for a finished shard run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardReport {
    /// Batches pulled from the provider
    pub batches: u64,

    /// URLs dropped because another shard owns them
    pub skipped: u64,

    pub ok: u64,
    pub http_errors: u64,
    pub network_errors: u64,

    /// Records carrying an interpreter-chosen non-OK status
    pub other: u64,
}

impl ShardReport {
    /// Number of URLs this shard attempted
    pub fn attempted(&self) -> u64 {
        self.ok + self.http_errors + self.network_errors + self.other
    }
}

impl WorkerStats {
    fn record(&self, status: &FetchStatus) {
        let counter = match status {
            FetchStatus::Ok => &self.ok,
            FetchStatus::Http(_) => &self.http_errors,
            FetchStatus::Network => &self.network_errors,
            FetchStatus::Unknown | FetchStatus::Other(_) => &self.other,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ShardReport {
        ShardReport {
            batches: self.batches.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            ok: self.ok.load(Ordering::Relaxed),
            http_errors: self.http_errors.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
            other: self.other.load(Ordering::Relaxed),
        }
    }
}

/// Runs `workers` units until the poller is exhausted
///
/// The first unit to hit an unrecoverable error ends the whole pool; its
/// siblings are dropped mid-flight.
pub async fn run_worker_pool<P, I, S>(
    workers: usize,
    assignment: Assignment,
    poller: &BatchPoller<P>,
    pipeline: &FetchPipeline<I, S>,
    stats: &WorkerStats,
) -> Result<(), ShardError>
where
    P: UrlProvider,
    I: ContentInterpreter,
    S: ResultSink,
{
    let units = (0..workers).map(|unit| worker_loop(unit, assignment, poller, pipeline, stats));
    try_join_all(units).await?;
    Ok(())
}

async fn worker_loop<P, I, S>(
    unit: usize,
    assignment: Assignment,
    poller: &BatchPoller<P>,
    pipeline: &FetchPipeline<I, S>,
    stats: &WorkerStats,
) -> Result<(), ShardError>
where
    P: UrlProvider,
    I: ContentInterpreter,
    S: ResultSink,
{
    while let Some(batch) = poller.next_batch().await? {
        stats.batches.fetch_add(1, Ordering::Relaxed);

        let total = batch.len();
        let owned: Vec<String> = batch.into_iter().filter(|url| assignment.owns(url)).collect();
        stats
            .skipped
            .fetch_add((total - owned.len()) as u64, Ordering::Relaxed);

        tracing::trace!(
            "Shard {} unit {} owns {} of {} URLs in batch",
            assignment.id(),
            unit,
            owned.len(),
            total
        );

        for url in &owned {
            let status = pipeline.process(url).await?;
            stats.record(&status);
        }
    }

    tracing::debug!("Shard {} unit {} finished", assignment.id(), unit);
    Ok(())
}
