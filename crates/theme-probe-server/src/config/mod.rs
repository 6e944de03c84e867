//! Configuration loading and resolution.
//!
//! Every setting resolves in the same order: explicit CLI value, then
//! environment variable, then built-in default.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;

use theme_probe::{ProbeConfig, ShopContext, DEFAULT_API_VERSION};

pub const ENV_SHOP: &str = "SHOPIFY_SHOP";
pub const ENV_ACCESS_TOKEN: &str = "SHOPIFY_ACCESS_TOKEN";
pub const ENV_API_VERSION: &str = "SHOPIFY_API_VERSION";
pub const ENV_API_BASE_URL: &str = "SHOPIFY_API_BASE_URL";
pub const ENV_TEMPLATES: &str = "PROBE_TEMPLATES";
pub const ENV_TARGET_BLOCKS: &str = "PROBE_TARGET_BLOCKS";
pub const ENV_CONCURRENCY: &str = "PROBE_CONCURRENCY";
pub const ENV_TIMEOUT_MS: &str = "PROBE_TIMEOUT_MS";
pub const ENV_PREVIEW_REQUIRED: &str = "PROBE_PREVIEW_REQUIRED";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Errors raised while resolving configuration.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing setting: {0} (pass the flag or set ${1})")]
    Missing(&'static str, &'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub shop: Option<String>,
    pub access_token: Option<String>,
    pub api_version: Option<String>,
    pub addr: Option<String>,
    pub templates: Vec<String>,
    pub targets: Vec<String>,
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub preview_required: bool,
}

/// Fully resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub shop: ShopContext,
    pub api_version: String,
    /// Replaces `https://{shop}/admin/api/{version}` when set.
    pub api_base_url: Option<String>,
    pub addr: SocketAddr,
    pub request_timeout_ms: u64,
    pub probe: ProbeConfig,
}

impl ServerConfig {
    /// Resolve against the process environment.
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` for environment variables.
    pub fn resolve<F>(overrides: ConfigOverrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let shop = overrides
            .shop
            .or_else(|| env(ENV_SHOP))
            .ok_or(ConfigError::Missing("shop", ENV_SHOP))?;
        let access_token = overrides
            .access_token
            .or_else(|| env(ENV_ACCESS_TOKEN))
            .ok_or(ConfigError::Missing("access token", ENV_ACCESS_TOKEN))?;
        let api_version = overrides
            .api_version
            .or_else(|| env(ENV_API_VERSION))
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let addr = match overrides.addr {
            Some(addr) => parse_addr(&addr)?,
            None => {
                let port = match env("BACKEND_PORT").or_else(|| env("PORT")) {
                    Some(p) => p.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                        name: "port",
                        value: p,
                    })?,
                    None => DEFAULT_PORT,
                };
                SocketAddr::from(([127, 0, 0, 1], port))
            }
        };

        let mut probe = ProbeConfig::default();

        let templates = non_empty_or(overrides.templates, || env(ENV_TEMPLATES).map(split_list));
        if let Some(templates) = templates {
            probe.template_names = templates;
        }

        let targets = non_empty_or(overrides.targets, || env(ENV_TARGET_BLOCKS).map(split_list));
        if let Some(targets) = targets {
            probe.targets = targets.into_iter().collect::<BTreeSet<_>>();
        }

        if let Some(concurrency) = overrides.concurrency {
            probe.concurrency = concurrency;
        } else if let Some(raw) = env(ENV_CONCURRENCY) {
            probe.concurrency = parse_number(ENV_CONCURRENCY, &raw)?;
        }
        if probe.concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "concurrency",
                value: "0".to_string(),
            });
        }

        let timeout_ms = match overrides.timeout_ms {
            Some(ms) => Some(ms),
            None => env(ENV_TIMEOUT_MS)
                .map(|raw| parse_number(ENV_TIMEOUT_MS, &raw))
                .transpose()?,
        };
        if let Some(ms) = timeout_ms {
            probe.timeout = Duration::from_millis(ms);
        }

        probe.preview_required = overrides.preview_required
            || env(ENV_PREVIEW_REQUIRED)
                .map(|v| parse_flag(&v))
                .unwrap_or(false);

        Ok(Self {
            shop: ShopContext::new(shop, access_token),
            api_version,
            api_base_url: env(ENV_API_BASE_URL),
            addr,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            probe,
        })
    }
}

fn non_empty_or<F>(values: Vec<String>, fallback: F) -> Option<Vec<String>>
where
    F: FnOnce() -> Option<Vec<String>>,
{
    if values.is_empty() {
        fallback().filter(|v| !v.is_empty())
    } else {
        Some(values)
    }
}

fn split_list(raw: String) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        name: "addr",
        value: raw.to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
