//! Per-URL fetch pipeline
//!
//! This module handles a single owned URL from request to record:
//! - Acquiring a fetch slot from the shard's concurrency budget
//! - Issuing the GET request (certificate verification disabled)
//! - Classifying the outcome
//! - Running the content interpreter over successful responses
//! - Handing exactly one record to the sink
//!
//! # Outcome Classification
//!
//! | Condition | Record | Shard |
//! |-----------|--------|-------|
//! | HTTP status outside 2xx | `ERROR:HTTP<code>` | continues |
//! | Timeout, refused/reset connection, disconnect mid-read, invalid URL | `ERROR:NETWORK` | continues |
//! | Redirect loop, malformed response | `ERROR:UNKNOWN` | stops after recording |
//! | 2xx | interpreter's status and payload | continues |
//! | Anything else | `ERROR:UNKNOWN` | stops after recording |

use crate::config::FetchConfig;
use crate::interpreter::ContentInterpreter;
use crate::record::{FetchRecord, FetchStatus};
use crate::shard::budget::ConcurrencyBudget;
use crate::sink::ResultSink;
use crate::ShardError;
use reqwest::Client;
use std::io;
use url::Url;

/// Class of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected failure; recorded as `ERROR:NETWORK`
    Network,

    /// Unexpected failure; recorded as `ERROR:UNKNOWN`, then the shard stops
    Unknown,
}

/// What came back from the server
#[derive(Debug)]
enum Download {
    Body(Vec<u8>),
    Status(u16),
}

/// Builds the HTTP client shared by every worker unit of a shard
///
/// Certificate verification is disabled.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(config.per_host_limit as usize)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sorts a transport error into the network class or the unknown class
///
/// Network: timeouts, refused connections, body read failures, invalid
/// URLs, and any error caused by a reset, aborted or prematurely closed
/// connection. Everything else, including redirect loops and malformed
/// responses, is unknown.
pub fn classify_error(error: &reqwest::Error) -> ErrorClass {
    if error.is_timeout()
        || error.is_connect()
        || error.is_body()
        || error.is_builder()
        || caused_by_disconnect(error)
    {
        ErrorClass::Network
    } else {
        ErrorClass::Unknown
    }
}

/// Walks the source chain looking for a dropped connection
fn caused_by_disconnect(error: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        if let Some(hyper_error) = cause.downcast_ref::<hyper::Error>() {
            if hyper_error.is_incomplete_message() || hyper_error.is_closed() {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// Key used for per-host accounting: `host:port`, or empty for unparseable URLs
pub fn host_key(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let host = parsed.host_str()?.to_string();
            Some(match parsed.port_or_known_default() {
                Some(port) => format!("{}:{}", host, port),
                None => host,
            })
        })
        .unwrap_or_default()
}

/// Fetches, classifies and records single URLs
pub struct FetchPipeline<I, S> {
    client: Client,
    budget: ConcurrencyBudget,
    interpreter: I,
    sink: S,
}

impl<I: ContentInterpreter, S: ResultSink> FetchPipeline<I, S> {
    pub fn new(client: Client, budget: ConcurrencyBudget, interpreter: I, sink: S) -> Self {
        Self {
            client,
            budget,
            interpreter,
            sink,
        }
    }

    pub fn budget(&self) -> &ConcurrencyBudget {
        &self.budget
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Processes one URL and returns the status that was recorded
    ///
    /// Exactly one record reaches the sink per call. `Err` means either the
    /// failure was unclassified (its `ERROR:UNKNOWN` record has already been
    /// handed to the sink) or the sink itself failed.
    pub async fn process(&self, url: &str) -> Result<FetchStatus, ShardError> {
        let downloaded = {
            let host = host_key(url);
            let Some(_slot) = self.budget.acquire(&host).await else {
                return self.fail(url, "fetch slot unavailable".to_string());
            };
            tracing::info!("downloading {}", url);
            self.download(url).await
        };

        let record = match downloaded {
            Ok(Download::Body(body)) => match self.interpreter.process(&body) {
                Ok(verdict) => FetchRecord::interpreted(url, verdict.status, verdict.payload),
                Err(e) => return self.fail(url, format!("content interpreter failed: {:#}", e)),
            },
            Ok(Download::Status(code)) => {
                tracing::debug!("{} answered HTTP {}", url, code);
                FetchRecord::error(url, FetchStatus::Http(code))
            }
            Err(e) => match classify_error(&e) {
                ErrorClass::Network => {
                    tracing::debug!("Network error for {}: {}", url, e);
                    FetchRecord::error(url, FetchStatus::Network)
                }
                ErrorClass::Unknown => return self.fail(url, e.to_string()),
            },
        };

        let status = record.status.clone();
        self.sink.put(record)?;
        Ok(status)
    }

    async fn download(&self, url: &str) -> Result<Download, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Ok(Download::Status(status.as_u16()));
        }

        Ok(Download::Body(response.bytes().await?.to_vec()))
    }

    /// Records `ERROR:UNKNOWN` for `url` and surfaces the failure
    fn fail(&self, url: &str, message: String) -> Result<FetchStatus, ShardError> {
        tracing::error!("Unclassified failure for {}: {}", url, message);
        self.sink.put(FetchRecord::error(url, FetchStatus::Unknown))?;
        Err(ShardError::Unclassified {
            url: url.to_string(),
            message,
        })
    }
}
