//! Shard-Fetch main entry point
//!
//! `run` starts the supervisor, which re-executes this binary once per shard
//! with the hidden `shard` subcommand.

use clap::{Args, Parser, Subcommand};
use shard_fetch::config::{load_config_with_hash, validate, Config};
use shard_fetch::interpreter::PhoneInterpreter;
use shard_fetch::output::{print_summary, RunSummary};
use shard_fetch::provider::ListProvider;
use shard_fetch::shard::run_shard;
use shard_fetch::sink::JsonLinesSink;
use shard_fetch::storage::{open_store, ResultStore, RunStatus};
use shard_fetch::supervisor::{ShardLaunch, Supervisor};
use shard_fetch::FetchRecord;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Shard-Fetch: a sharded document fetcher
///
/// Shard-Fetch splits a list of URLs across independent shard processes,
/// downloads each URL under global and per-host concurrency caps and
/// extracts phone numbers from every page it fetches.
#[derive(Parser, Debug)]
#[command(name = "shard-fetch")]
#[command(version = "1.0.0")]
#[command(about = "A sharded document fetcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Spawn all shards and collect their results
    Run(RunArgs),

    /// Run a single shard, writing records to stdout
    #[command(hide = true)]
    Shard(ShardArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// File with one URL per line
    #[arg(value_name = "URLS_FILE")]
    urls: PathBuf,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of shard processes (overrides shards.count)
    #[arg(long)]
    num_shards: Option<u32>,

    /// Maximum simultaneous downloads per shard (overrides fetch.max-in-flight)
    #[arg(long)]
    max_downloads: Option<u32>,
}

#[derive(Args, Debug)]
struct ShardArgs {
    /// File with one URL per line
    #[arg(value_name = "URLS_FILE")]
    urls: PathBuf,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Id of this shard, in [0, num-shards)
    #[arg(long)]
    shard_id: u32,

    /// Total number of shards
    #[arg(long)]
    num_shards: u32,

    /// Maximum simultaneous downloads (overrides fetch.max-in-flight)
    #[arg(long)]
    max_downloads: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run(args) => handle_run(args, cli.verbose, cli.quiet).await,
        Command::Shard(args) => handle_shard(args).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; a shard's stdout carries its result records.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shard_fetch=info,warn"),
            1 => EnvFilter::new("shard_fetch=debug,info"),
            2 => EnvFilter::new("shard_fetch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file if one was given, else the defaults
fn load_or_default(path: Option<&Path>) -> Result<(Config, String), Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((config, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    Ok((config, hash))
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    Err(e.into())
                }
            }
        }
        None => Ok((Config::default(), "default".to_string())),
    }
}

/// Handles the hidden `shard` subcommand: runs one shard to completion
async fn handle_shard(args: ShardArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, _config_hash) = load_or_default(args.config.as_deref())?;
    if let Some(max_downloads) = args.max_downloads {
        config.fetch.max_in_flight = max_downloads;
    }
    validate(&config)?;

    let provider = ListProvider::from_file(&args.urls)?;

    run_shard(
        args.shard_id,
        args.num_shards,
        &config.fetch,
        provider,
        PhoneInterpreter::new(),
        JsonLinesSink::stdout(),
    )
    .await?;

    Ok(())
}

/// Handles the `run` subcommand: supervises all shards and drains their records
async fn handle_run(
    args: RunArgs,
    verbose: u8,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, config_hash) = load_or_default(args.config.as_deref())?;
    if let Some(num_shards) = args.num_shards {
        config.shards.count = num_shards;
    }
    if let Some(max_downloads) = args.max_downloads {
        config.fetch.max_in_flight = max_downloads;
    }
    validate(&config)?;

    let num_shards = config.shards.count;
    tracing::info!(
        "Fetching {} with {} shards, {} downloads per shard",
        args.urls.display(),
        num_shards,
        config.fetch.max_in_flight
    );

    let mut launch = ShardLaunch::new(std::env::current_exe()?)
        .arg("shard")
        .arg(&args.urls)
        .arg("--max-downloads")
        .arg(config.fetch.max_in_flight.to_string());
    if let Some(path) = &args.config {
        launch = launch.arg("--config").arg(path);
    }
    if quiet {
        launch = launch.arg("--quiet");
    } else if verbose > 0 {
        launch = launch.args(std::iter::repeat("--verbose").take(verbose as usize));
    }

    let mut store = match &config.output.database_path {
        Some(path) => {
            let mut store = open_store(Path::new(path))?;
            let run_id = store.create_run(&config_hash, num_shards)?;
            tracing::info!("Storing results in {} (run {})", path, run_id);
            Some((store, run_id))
        }
        None => None,
    };

    let mut summary = RunSummary::new(num_shards);
    let mut supervisor = Supervisor::new(launch, num_shards);
    supervisor.start()?;

    let drained = tokio::select! {
        result = supervisor.drain(config.output.drain_interval(), |record| {
            log_record(&record);
            summary.record(&record);
            if let Some((store, run_id)) = store.as_mut() {
                store.insert_result(*run_id, &record)?;
            }
            Ok(())
        }) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let exits = match drained {
        Some(result) => result?,
        None => {
            tracing::warn!("Interrupted, stopping shards");
            supervisor.kill_all().await?;
            supervisor.join(None).await?
        }
    };

    summary.finish(&exits);

    if let Some((store, run_id)) = store.as_mut() {
        let status = if summary.is_success() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        store.finish_run(*run_id, status)?;
    }

    print_summary(&summary);

    if summary.is_success() {
        tracing::info!("Run completed successfully");
        Ok(())
    } else {
        Err(format!(
            "{} of {} shards died abnormally: {:?}",
            summary.failed_shards.len(),
            num_shards,
            summary.failed_shards
        )
        .into())
    }
}

/// Logs a record as it arrives from a shard
fn log_record(record: &FetchRecord) {
    match record.payload() {
        Some(payload) => tracing::info!(
            "got result {} => {}: {}",
            record.url,
            record.status,
            serde_json::to_string(payload).unwrap_or_default()
        ),
        None => tracing::info!("got result {} => {}: no payload", record.url, record.status),
    }
}
