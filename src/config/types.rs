use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Shard-Fetch
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub shards: ShardsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Shard layout configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShardsConfig {
    /// Total number of shard processes; fixed for the lifetime of a run
    #[serde(default = "default_shard_count")]
    pub count: u32,
}

impl Default for ShardsConfig {
    fn default() -> Self {
        Self {
            count: default_shard_count(),
        }
    }
}

/// Per-shard fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Maximum simultaneous downloads per shard; also the worker count
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: u32,

    /// Maximum simultaneous downloads against a single host
    #[serde(default = "default_per_host_limit")]
    pub per_host_limit: u32,

    /// Maximum number of URLs requested from the provider per pull
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Wait before pulling again after the provider had nothing to hand out (seconds)
    #[serde(default = "default_poll_wait_secs")]
    pub poll_wait_secs: u64,

    /// Whole-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl FetchConfig {
    pub fn poll_wait(&self) -> Duration {
        Duration::from_secs(self.poll_wait_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            per_host_limit: default_per_host_limit(),
            batch_size: default_batch_size(),
            poll_wait_secs: default_poll_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database receiving drained records; not stored when absent
    #[serde(default)]
    pub database_path: Option<String>,

    /// Interval between supervisor drain passes (milliseconds)
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,
}

impl OutputConfig {
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            drain_interval_ms: default_drain_interval_ms(),
        }
    }
}

fn default_shard_count() -> u32 {
    1
}

fn default_max_in_flight() -> u32 {
    10
}

fn default_per_host_limit() -> u32 {
    2
}

fn default_batch_size() -> u32 {
    1
}

fn default_poll_wait_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("shard-fetch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_drain_interval_ms() -> u64 {
    100
}
