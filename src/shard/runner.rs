//! A single shard: partition slot, poller, worker pool and fetch pipeline

use crate::config::{validate_fetch_config, FetchConfig};
use crate::interpreter::ContentInterpreter;
use crate::provider::UrlProvider;
use crate::shard::budget::ConcurrencyBudget;
use crate::shard::partition::Assignment;
use crate::shard::pipeline::{build_http_client, FetchPipeline};
use crate::shard::poller::BatchPoller;
use crate::shard::state::ShardState;
use crate::shard::worker::{run_worker_pool, ShardReport, WorkerStats};
use crate::sink::ResultSink;
use crate::ShardError;
use reqwest::Client;

/// One shard of a run
///
/// Owns nothing shared with sibling shards except the provider's stream and
/// the sink's destination.
pub struct Shard<P, I, S> {
    assignment: Assignment,
    workers: usize,
    poller: BatchPoller<P>,
    pipeline: FetchPipeline<I, S>,
    stats: WorkerStats,
    state: ShardState,
}

impl<P, I, S> Shard<P, I, S>
where
    P: UrlProvider,
    I: ContentInterpreter,
    S: ResultSink,
{
    /// Creates a shard with its own HTTP client
    ///
    /// # Arguments
    ///
    /// * `assignment` - This shard's id and the total shard count
    /// * `config` - Concurrency caps, batch size, poll wait and timeouts
    /// * `provider` - Source of URLs; must present the same stream to every shard
    /// * `interpreter` - Turns successful response bodies into payloads
    /// * `sink` - Receives one record per attempted URL
    pub fn new(
        assignment: Assignment,
        config: &FetchConfig,
        provider: P,
        interpreter: I,
        sink: S,
    ) -> Result<Self, ShardError> {
        validate_fetch_config(config)?;
        let client = build_http_client(config)?;
        Self::with_client(assignment, config, client, provider, interpreter, sink)
    }

    /// Creates a shard around an existing HTTP client
    ///
    /// Fails with `ShardError::Config` if `config` has a zero batch size or
    /// a zero concurrency limit.
    pub fn with_client(
        assignment: Assignment,
        config: &FetchConfig,
        client: Client,
        provider: P,
        interpreter: I,
        sink: S,
    ) -> Result<Self, ShardError> {
        validate_fetch_config(config)?;
        let workers = config.max_in_flight as usize;
        let budget = ConcurrencyBudget::new(workers, config.per_host_limit as usize);

        Ok(Self {
            assignment,
            workers,
            poller: BatchPoller::new(provider, config.batch_size as usize, config.poll_wait()),
            pipeline: FetchPipeline::new(client, budget, interpreter, sink),
            stats: WorkerStats::default(),
            state: ShardState::Init,
        })
    }

    pub fn state(&self) -> ShardState {
        self.state
    }

    pub fn assignment(&self) -> Assignment {
        self.assignment
    }

    /// Runs the shard until the provider is exhausted
    ///
    /// On success the sink has been closed and the shard is `Terminated`.
    /// On an unclassified failure the run stops immediately, the sink is left
    /// as is and the error is returned so the owning process can exit loudly.
    pub async fn run(&mut self) -> Result<ShardReport, ShardError> {
        self.transition(ShardState::Running)?;
        tracing::info!(
            "Shard {}/{} running with {} workers",
            self.assignment.id(),
            self.assignment.num_shards(),
            self.workers
        );

        if let Err(e) = run_worker_pool(
            self.workers,
            self.assignment,
            &self.poller,
            &self.pipeline,
            &self.stats,
        )
        .await
        {
            tracing::error!("Shard {} stopped: {}", self.assignment.id(), e);
            return Err(e);
        }

        self.transition(ShardState::Drained)?;
        self.pipeline.sink().close()?;
        self.transition(ShardState::Terminated)?;

        let report = self.stats.snapshot();
        tracing::info!(
            "Shard {} finished: {} attempted ({} ok, {} http errors, {} network errors), {} skipped",
            self.assignment.id(),
            report.attempted(),
            report.ok,
            report.http_errors,
            report.network_errors,
            report.skipped
        );
        Ok(report)
    }

    fn transition(&mut self, to: ShardState) -> Result<(), ShardError> {
        if !self.state.can_transition_to(to) {
            return Err(ShardError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!("Shard {}: {} -> {}", self.assignment.id(), self.state, to);
        self.state = to;
        Ok(())
    }
}
