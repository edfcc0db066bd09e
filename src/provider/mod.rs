//! URL providers
//!
//! A provider is the pull-based source every shard reads from. It speaks a
//! tri-state protocol: a batch of URLs, nothing right now, or nothing ever
//! again.
//!
//! Shards never coordinate. Each one filters the batches it pulls down to the
//! URLs it owns, so every shard must observe the *same* logical stream. A
//! provider whose instances hand out different streams to different shards
//! would silently duplicate or lose URLs.

mod list;

pub use list::ListProvider;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while pulling URLs
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to read URL source: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL source unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a single pull from a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull {
    /// Up to `max_count` URLs, in provider order
    Urls(Vec<String>),

    /// Nothing right now; more may arrive later
    Empty,

    /// No more URLs, ever
    Exhausted,
}

/// Pull-based source of pending URLs
#[async_trait]
pub trait UrlProvider: Send {
    /// Hands out at most `max_count` URLs
    ///
    /// Implementations must return `Pull::Empty` rather than an empty
    /// `Pull::Urls` when nothing is available yet.
    async fn get_urls(&mut self, max_count: usize) -> Result<Pull, ProviderError>;
}
