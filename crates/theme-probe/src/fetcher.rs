//! Asset retrieval with bounded fan-out.
//!
//! Wraps a [`StorefrontSource`] and pairs every requested key with its own
//! outcome, so one unreadable asset never hides the others.

use crate::error::ProbeResult;
use crate::source::StorefrontSource;
use crate::types::Asset;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::debug;

/// Result of fetching one asset during a fan-out.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub key: String,
    pub result: ProbeResult<Asset>,
}

/// Fetches theme assets from a remote source.
#[derive(Clone)]
pub struct AssetFetcher {
    source: Arc<dyn StorefrontSource>,
    concurrency: usize,
}

impl AssetFetcher {
    /// `concurrency` bounds the number of requests in flight; zero is treated as one.
    pub fn new(source: Arc<dyn StorefrontSource>, concurrency: usize) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch a single asset's text.
    pub async fn fetch_asset(&self, theme_id: u64, key: &str) -> ProbeResult<Asset> {
        let content = self.source.get_asset_content(theme_id, key).await?;
        debug!("fetched {key} ({} bytes) from theme {theme_id}", content.len());
        Ok(Asset::fetched(key, content))
    }

    /// Fetch many assets concurrently.
    ///
    /// Outcomes come back in the same order as `keys`.
    pub async fn fetch_all(&self, theme_id: u64, keys: &[String]) -> Vec<FetchOutcome> {
        stream::iter(keys.to_vec())
            .map(|key| async move {
                let result = self.fetch_asset(theme_id, &key).await;
                FetchOutcome { key, result }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
