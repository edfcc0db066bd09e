use crate::provider::{ProviderError, Pull, UrlProvider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;

/// Provider over a fixed list of URLs
///
/// Loading the same file in every shard process gives each shard an identical
/// stream, which is what ownership filtering relies on.
#[derive(Debug, Clone, Default)]
pub struct ListProvider {
    urls: VecDeque<String>,
}

impl ListProvider {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads one URL per line, trimming whitespace and skipping blank lines
    pub fn from_file(path: &Path) -> Result<Self, ProviderError> {
        let content = std::fs::read_to_string(path)?;
        let provider = Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        );
        tracing::debug!(
            "Loaded {} URLs from {}",
            provider.remaining(),
            path.display()
        );
        Ok(provider)
    }

    /// Number of URLs not yet handed out
    pub fn remaining(&self) -> usize {
        self.urls.len()
    }
}

#[async_trait]
impl UrlProvider for ListProvider {
    async fn get_urls(&mut self, max_count: usize) -> Result<Pull, ProviderError> {
        if self.urls.is_empty() {
            return Ok(Pull::Exhausted);
        }
        if max_count == 0 {
            return Ok(Pull::Empty);
        }

        let take = max_count.min(self.urls.len());
        Ok(Pull::Urls(self.urls.drain(..take).collect()))
    }
}
