//! Shard module: the sharded, concurrency-bounded fetch engine
//!
//! This module contains the core of a shard process, including:
//! - Coordination-free URL ownership (CRC32 partitioning)
//! - Serialized batch polling with a fixed wait on empty pulls
//! - Global and per-host fetch slot accounting
//! - The per-URL fetch pipeline and outcome classification
//! - The worker pool and the shard lifecycle

mod budget;
mod partition;
mod pipeline;
mod poller;
mod runner;
mod state;
mod worker;

pub use budget::{ConcurrencyBudget, FetchSlot};
pub use partition::{owns, shard_for, url_hash, Assignment};
pub use pipeline::{build_http_client, classify_error, host_key, ErrorClass, FetchPipeline};
pub use poller::{Batch, BatchPoller};
pub use runner::Shard;
pub use state::ShardState;
pub use worker::{run_worker_pool, ShardReport, WorkerStats};

use crate::config::FetchConfig;
use crate::interpreter::ContentInterpreter;
use crate::provider::UrlProvider;
use crate::sink::ResultSink;
use crate::ShardError;

/// Runs shard `shard_id` of `num_shards` to completion
///
/// This is the entry point of a shard process. It will:
/// 1. Validate the shard id
/// 2. Build the HTTP client and concurrency budget
/// 3. Drain the provider through the worker pool
/// 4. Close the sink
pub async fn run_shard<P, I, S>(
    shard_id: u32,
    num_shards: u32,
    config: &FetchConfig,
    provider: P,
    interpreter: I,
    sink: S,
) -> Result<ShardReport, ShardError>
where
    P: UrlProvider,
    I: ContentInterpreter,
    S: ResultSink,
{
    let assignment = Assignment::new(shard_id, num_shards)?;
    let mut shard = Shard::new(assignment, config, provider, interpreter, sink)?;
    shard.run().await
}
