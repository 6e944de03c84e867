//! Shopify Admin API client.
//!
//! Implements [`StorefrontSource`] over the REST theme endpoints and the
//! GraphQL product query. Retries on 5xx and transport errors with
//! exponential backoff, and backs off on 429 honouring `Retry-After`.
//! Payloads are decoded into typed records right here; a body that does not
//! match is reported as the remote breaking its contract.

use crate::error::{ProbeError, ProbeResult};
use crate::source::StorefrontSource;
use crate::types::{PublishedItem, ShopContext, ThemeSummary};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Admin API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-10";

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const MAX_RETRIES: u32 = 2;
const MAX_RETRY_AFTER_SECS: u64 = 10;

const PUBLISHED_PRODUCTS_QUERY: &str = r#"query FirstPublishedProducts($first: Int!) {
  products(first: $first, query: "published_status:published") {
    edges {
      node {
        id
        title
        handle
      }
    }
  }
}"#;

// ── Wire records ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ThemesEnvelope {
    themes: Vec<ThemeSummary>,
}

#[derive(Debug, Deserialize)]
struct AssetListEnvelope {
    assets: Vec<AssetListEntry>,
}

#[derive(Debug, Deserialize)]
struct AssetListEntry {
    key: String,
}

#[derive(Debug, Deserialize)]
struct AssetEnvelope {
    asset: AssetBody,
}

#[derive(Debug, Deserialize)]
struct AssetBody {
    key: String,
    /// Absent for binary assets, which carry an `attachment` instead.
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: Connection<PublishedItem>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

// ── Client ──────────────────────────────────────────────────────

/// Admin API client for one shop.
#[derive(Clone)]
pub struct AdminClient {
    client: reqwest::Client,
    /// e.g. `https://example.myshopify.com/admin/api/2024-10`
    base_url: String,
    access_token: String,
    retry_base: Duration,
}

impl AdminClient {
    /// Client for `shop` at the given API version.
    pub fn new(shop: &ShopContext, api_version: &str, timeout_ms: u64) -> Self {
        let base_url = format!("https://{}/admin/api/{api_version}", shop.shop);
        Self::with_base_url(base_url, &shop.access_token, timeout_ms)
    }

    /// Client against an explicit API root.
    pub fn with_base_url(base_url: impl Into<String>, access_token: &str, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("theme-probe/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            retry_base: Duration::from_millis(500),
        }
    }

    /// Override the first retry delay; later retries double it.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request built by `build`, retrying transient failures.
    async fn execute<F>(&self, what: &str, build: F) -> ProbeResult<String>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut retries = 0u32;

        loop {
            let resp = build()
                .header(ACCESS_TOKEN_HEADER, &self.access_token)
                .send()
                .await;

            let r = match resp {
                Ok(r) => r,
                Err(e) => {
                    if retries < MAX_RETRIES {
                        retries += 1;
                        tokio::time::sleep(self.backoff(retries)).await;
                        continue;
                    }
                    return Err(ProbeError::RemoteUnavailable(format!("{what}: {e}")));
                }
            };

            let status = r.status();

            if status.is_server_error() && retries < MAX_RETRIES {
                retries += 1;
                debug!("{what}: {status}, retry {retries}/{MAX_RETRIES}");
                tokio::time::sleep(self.backoff(retries)).await;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let retry_after = r
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|secs| secs.is_finite())
                    .map(|secs| {
                        Duration::from_secs_f64(secs.clamp(0.0, MAX_RETRY_AFTER_SECS as f64))
                    })
                    .unwrap_or_else(|| self.backoff(retries));
                debug!("{what}: rate limited, waiting {retry_after:?}");
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(ProbeError::NotFound(what.to_string()));
            }
            if !status.is_success() {
                return Err(ProbeError::RemoteUnavailable(format!("{what}: HTTP {status}")));
            }

            return r
                .text()
                .await
                .map_err(|e| ProbeError::RemoteUnavailable(format!("{what}: {e}")));
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base * 2u32.pow(attempt.saturating_sub(1))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        what: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> ProbeResult<T> {
        let url = format!("{}/{path}", self.base_url);
        let body = self
            .execute(what, || self.client.get(&url).query(query))
            .await?;
        decode(what, &body)
    }
}

fn decode<T: DeserializeOwned>(what: &str, body: &str) -> ProbeResult<T> {
    serde_json::from_str(body)
        .map_err(|e| ProbeError::RemoteUnavailable(format!("{what}: malformed response: {e}")))
}

#[async_trait]
impl StorefrontSource for AdminClient {
    async fn list_themes(&self) -> ProbeResult<Vec<ThemeSummary>> {
        let envelope: ThemesEnvelope = self.get_json("themes", "themes.json", &[]).await?;
        Ok(envelope.themes)
    }

    async fn list_asset_keys(&self, theme_id: u64) -> ProbeResult<Vec<String>> {
        let what = format!("assets of theme {theme_id}");
        let envelope: AssetListEnvelope = self
            .get_json(&what, &format!("themes/{theme_id}/assets.json"), &[])
            .await?;
        Ok(envelope.assets.into_iter().map(|a| a.key).collect())
    }

    async fn get_asset_content(&self, theme_id: u64, key: &str) -> ProbeResult<String> {
        let what = format!("asset {key} of theme {theme_id}");
        let envelope: AssetEnvelope = self
            .get_json(
                &what,
                &format!("themes/{theme_id}/assets.json"),
                &[("asset[key]", key)],
            )
            .await?;
        envelope
            .asset
            .value
            .ok_or_else(|| ProbeError::NotFound(format!("{} has no text value", envelope.asset.key)))
    }

    async fn list_published_items(&self, limit: usize) -> ProbeResult<Vec<PublishedItem>> {
        let url = format!("{}/graphql.json", self.base_url);
        let payload = serde_json::json!({
            "query": PUBLISHED_PRODUCTS_QUERY,
            "variables": { "first": limit },
        });
        let body = self
            .execute("published products", || self.client.post(&url).json(&payload))
            .await?;

        let response: GraphqlResponse<ProductsData> = decode("published products", &body)?;
        if let Some(err) = response.errors.first() {
            return Err(ProbeError::RemoteUnavailable(format!(
                "published products: {}",
                err.message
            )));
        }
        let data = response.data.ok_or_else(|| {
            ProbeError::RemoteUnavailable("published products: response has no data".into())
        })?;

        Ok(data.products.edges.into_iter().map(|e| e.node).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_from_shop() {
        let shop = ShopContext::new("demo.myshopify.com", "shpat_x");
        let client = AdminClient::new(&shop, DEFAULT_API_VERSION, 5000);
        assert_eq!(
            client.base_url(),
            "https://demo.myshopify.com/admin/api/2024-10"
        );
    }

    #[test]
    fn test_backoff_doubles() {
        let client = AdminClient::with_base_url("http://localhost/", "t", 1000)
            .with_retry_base(Duration::from_millis(100));
        assert_eq!(client.base_url(), "http://localhost");
        assert_eq!(client.backoff(1), Duration::from_millis(100));
        assert_eq!(client.backoff(2), Duration::from_millis(200));
    }

    #[test]
    fn test_decode_products_connection() {
        let body = r#"{"data":{"products":{"edges":[{"node":{"id":"gid://shopify/Product/1","title":"Shirt","handle":"shirt"}}]}}}"#;
        let response: GraphqlResponse<ProductsData> = decode("products", body).unwrap();
        let items: Vec<PublishedItem> = response
            .data
            .unwrap()
            .products
            .edges
            .into_iter()
            .map(|e| e.node)
            .collect();
        assert_eq!(items[0].handle, "shirt");
    }

    #[test]
    fn test_decode_mismatch_is_remote_error() {
        let err = decode::<ThemesEnvelope>("themes", r#"{"theme":[]}"#).unwrap_err();
        assert!(matches!(err, ProbeError::RemoteUnavailable(_)));
    }
}
