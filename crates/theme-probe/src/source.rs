//! Remote storefront abstraction.
//!
//! Defines the `StorefrontSource` trait the pipeline reads from. The
//! production implementation is [`crate::admin::AdminClient`]; tests supply
//! in-memory fakes.

use crate::error::ProbeResult;
use crate::types::{PublishedItem, ThemeSummary};
use async_trait::async_trait;

/// Read-only view of a shop's themes and catalog.
#[async_trait]
pub trait StorefrontSource: Send + Sync {
    /// Every theme installed in the shop.
    async fn list_themes(&self) -> ProbeResult<Vec<ThemeSummary>>;
    /// Keys of every asset inside a theme.
    async fn list_asset_keys(&self, theme_id: u64) -> ProbeResult<Vec<String>>;
    /// Text content of one asset.
    async fn get_asset_content(&self, theme_id: u64, key: &str) -> ProbeResult<String>;
    /// Up to `limit` items with published status.
    async fn list_published_items(&self, limit: usize) -> ProbeResult<Vec<PublishedItem>>;
}
