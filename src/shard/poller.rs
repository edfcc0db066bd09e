//! Batch polling
//!
//! The poller turns a provider's tri-state pulls into a lazy sequence of
//! non-empty batches. All worker units of a shard share one poller; a lock
//! around the provider keeps at most one pull in flight at a time.

use crate::provider::{ProviderError, Pull, UrlProvider};
use std::time::Duration;
use tokio::sync::Mutex;

/// Ordered URLs obtained from one pull
pub type Batch = Vec<String>;

struct PollerState<P> {
    provider: P,
    exhausted: bool,
}

/// Shared, serialized source of batches
pub struct BatchPoller<P> {
    state: Mutex<PollerState<P>>,
    batch_size: usize,
    wait: Duration,
}

impl<P: UrlProvider> BatchPoller<P> {
    /// Creates a poller pulling at most `batch_size` URLs at a time and
    /// waiting `wait` after every empty pull
    pub fn new(provider: P, batch_size: usize, wait: Duration) -> Self {
        Self {
            state: Mutex::new(PollerState {
                provider,
                exhausted: false,
            }),
            batch_size,
            wait,
        }
    }

    /// Returns the next non-empty batch, or None once the provider is exhausted
    ///
    /// An empty pull suspends the caller for the wait interval and pulls
    /// again. The lock is held across that wait, so other callers queue
    /// behind it instead of hammering the provider. After exhaustion the
    /// provider is never called again.
    pub async fn next_batch(&self) -> Result<Option<Batch>, ProviderError> {
        let mut state = self.state.lock().await;

        loop {
            if state.exhausted {
                return Ok(None);
            }

            match state.provider.get_urls(self.batch_size).await? {
                Pull::Urls(urls) if !urls.is_empty() => {
                    tracing::trace!("Pulled batch of {} URLs", urls.len());
                    return Ok(Some(urls));
                }
                Pull::Urls(_) | Pull::Empty => {
                    tracing::debug!("Provider has no URLs right now, waiting {:?}", self.wait);
                    tokio::time::sleep(self.wait).await;
                }
                Pull::Exhausted => {
                    tracing::debug!("Provider exhausted");
                    state.exhausted = true;
                }
            }
        }
    }

    /// Returns true once the provider has signaled permanent exhaustion
    pub async fn is_exhausted(&self) -> bool {
        self.state.lock().await.exhausted
    }
}
