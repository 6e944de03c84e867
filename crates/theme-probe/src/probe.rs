//! Probe orchestrator: runs the whole capability check for one shop.
//!
//! Stages run strictly in order:
//!
//! 1. **ResolvingTheme**: list themes and pick the published one
//! 2. **FetchingTemplates**: list theme assets, fetch the qualifying JSON templates
//! 3. **ParsingTemplates**: find each template's main section
//! 4. **FetchingSections**: fetch the referenced section markup
//! 5. **ExtractingSchemas**: pull the `{% schema %}` body out of each section
//! 6. **Evaluating**: compute capability flags
//! 7. **ResolvingPreview**: build the theme editor preview link
//!
//! Only theme resolution and the asset listing are fatal. Every other
//! failure is confined to the asset it concerns, recorded as a
//! [`Degradation`] and the probe moves on.

use crate::capability::{assess, evaluate};
use crate::error::{ProbeError, ProbeResult};
use crate::fetcher::AssetFetcher;
use crate::preview::{editor_url, first_published};
use crate::resolver::resolve_published;
use crate::schema::extract_schema;
use crate::source::StorefrontSource;
use crate::template::main_section_type;
use crate::types::*;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pipeline stage, used to label progress and degradations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStage {
    ResolvingTheme,
    FetchingTemplates,
    ParsingTemplates,
    FetchingSections,
    ExtractingSchemas,
    Evaluating,
    ResolvingPreview,
    Done,
}

impl ProbeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStage::ResolvingTheme => "resolving_theme",
            ProbeStage::FetchingTemplates => "fetching_templates",
            ProbeStage::ParsingTemplates => "parsing_templates",
            ProbeStage::FetchingSections => "fetching_sections",
            ProbeStage::ExtractingSchemas => "extracting_schemas",
            ProbeStage::Evaluating => "evaluating",
            ProbeStage::ResolvingPreview => "resolving_preview",
            ProbeStage::Done => "done",
        }
    }
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal failure absorbed during a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    pub stage: ProbeStage,
    /// Asset key (or other unit) the failure concerns.
    pub key: String,
    pub error: ProbeError,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.key, self.error)
    }
}

/// Outcome of a probe that did not fail outright.
#[derive(Debug, Clone)]
pub struct ProbeRun {
    pub report: CapabilityReport,
    pub degradations: Vec<Degradation>,
}

/// Knobs for a probe.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Page types whose JSON template is inspected, e.g. `product`.
    pub template_names: Vec<String>,
    /// Block types to report on, e.g. `@app` or an extension block id.
    ///
    /// To find a specific app's theme blocks, list the full block type as it
    /// appears in section schemas, e.g.
    /// `shopify://apps/<app>/blocks/product-reviews/<extension-uuid>`.
    pub targets: BTreeSet<String>,
    /// Maximum asset requests in flight.
    pub concurrency: usize,
    /// Overall time budget.
    pub timeout: Duration,
    /// Answer 404 when no published item exists to preview.
    pub preview_required: bool,
    /// How many published items to request when resolving the preview.
    pub preview_limit: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            template_names: vec!["product".to_string()],
            targets: BTreeSet::from(["@app".to_string()]),
            concurrency: 4,
            timeout: Duration::from_secs(15),
            preview_required: false,
            preview_limit: 1,
        }
    }
}

/// Collects degradations and logs each one as it happens.
#[derive(Default)]
struct DegradationLog {
    entries: Vec<Degradation>,
}

impl DegradationLog {
    fn record(&mut self, stage: ProbeStage, key: impl Into<String>, error: ProbeError) {
        let key = key.into();
        warn!("{stage}: skipping {key}: {error}");
        self.entries.push(Degradation { stage, key, error });
    }
}

/// Runs probes against one storefront source.
pub struct ProbeOrchestrator {
    source: Arc<dyn StorefrontSource>,
    fetcher: AssetFetcher,
    config: ProbeConfig,
}

impl ProbeOrchestrator {
    pub fn new(source: Arc<dyn StorefrontSource>, config: ProbeConfig) -> Self {
        let fetcher = AssetFetcher::new(Arc::clone(&source), config.concurrency);
        Self {
            source,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe the shop within the configured time budget.
    pub async fn probe(&self, shop: &ShopContext) -> ProbeResult<ProbeRun> {
        self.probe_with_cancel(shop, &CancellationToken::new()).await
    }

    /// Probe the shop, giving up early when `cancel` fires.
    ///
    /// Cancellation and timeout both drop in-flight requests and yield
    /// [`ProbeError::Cancelled`], never a partial report.
    pub async fn probe_with_cancel(
        &self,
        shop: &ShopContext,
        cancel: &CancellationToken,
    ) -> ProbeResult<ProbeRun> {
        let start = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("probe of {} cancelled after {:.1}s", shop.shop, start.elapsed().as_secs_f64());
                Err(ProbeError::Cancelled)
            }
            outcome = tokio::time::timeout(self.config.timeout, self.run(shop)) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    warn!("probe of {} timed out after {:?}", shop.shop, self.config.timeout);
                    Err(ProbeError::Cancelled)
                }
            },
        };

        if let Err(e) = &result {
            warn!("probe of {} failed: {e}", shop.shop);
        }
        result
    }

    async fn run(&self, shop: &ShopContext) -> ProbeResult<ProbeRun> {
        let start = Instant::now();
        let mut log = DegradationLog::default();

        // ── Resolve the published theme ──

        let themes = self.source.list_themes().await?;
        let theme = match resolve_published(&themes) {
            Ok(theme) => theme,
            Err(e) if e.is_not_found() => {
                info!(
                    "{}: {} has no published theme",
                    ProbeStage::ResolvingTheme,
                    shop.shop
                );
                return Ok(ProbeRun {
                    report: CapabilityReport::without_theme(),
                    degradations: log.entries,
                });
            }
            Err(e) => return Err(e),
        };
        info!(
            "probing theme {} ({:?}) of {}",
            theme.id, theme.name, shop.shop
        );

        // ── Fetch qualifying templates ──

        let asset_keys = self.source.list_asset_keys(theme.id).await?;
        let listed: HashSet<&str> = asset_keys.iter().map(String::as_str).collect();

        let wanted: HashSet<String> = self
            .config
            .template_names
            .iter()
            .map(|name| template_key(name))
            .collect();
        let template_keys: Vec<String> = asset_keys
            .iter()
            .filter(|key| wanted.contains(key.as_str()))
            .cloned()
            .collect();
        debug!(
            "{}: {} assets listed, {} qualifying templates",
            ProbeStage::FetchingTemplates,
            asset_keys.len(),
            template_keys.len()
        );

        let template_outcomes = self.fetcher.fetch_all(theme.id, &template_keys).await;

        // ── Find each template's main section ──

        let mut section_keys: Vec<String> = Vec::new();
        let mut templates_read = 0usize;
        for outcome in template_outcomes {
            let text = match outcome.result {
                Ok(Asset {
                    content: Some(text),
                    ..
                }) => text,
                Ok(_) => {
                    log.record(
                        ProbeStage::FetchingTemplates,
                        outcome.key,
                        ProbeError::NotFound("asset has no text content".into()),
                    );
                    continue;
                }
                Err(e) => {
                    log.record(ProbeStage::FetchingTemplates, outcome.key, e);
                    continue;
                }
            };

            let section_type = match main_section_type(&text) {
                Ok(section_type) => section_type,
                Err(e) => {
                    log.record(ProbeStage::ParsingTemplates, outcome.key, e);
                    continue;
                }
            };
            templates_read += 1;

            let Some(section_type) = section_type else {
                debug!("{} declares no main section", outcome.key);
                continue;
            };
            let key = section_key(&section_type);
            if !listed.contains(key.as_str()) {
                let error = ProbeError::NotFound(format!(
                    "main section of {} is not in the theme",
                    outcome.key
                ));
                log.record(ProbeStage::ParsingTemplates, key, error);
                continue;
            }
            if !section_keys.contains(&key) {
                section_keys.push(key);
            }
        }

        // ── Fetch sections and extract their schemas ──

        let section_outcomes = self.fetcher.fetch_all(theme.id, &section_keys).await;

        let mut schemas: Vec<Option<SectionSchema>> = Vec::with_capacity(section_outcomes.len());
        let mut sections_read = 0usize;
        for outcome in section_outcomes {
            let text = match outcome.result {
                Ok(Asset {
                    content: Some(text),
                    ..
                }) => text,
                Ok(_) => {
                    log.record(
                        ProbeStage::FetchingSections,
                        outcome.key,
                        ProbeError::NotFound("asset has no text content".into()),
                    );
                    continue;
                }
                Err(e) => {
                    log.record(ProbeStage::FetchingSections, outcome.key, e);
                    continue;
                }
            };

            sections_read += 1;
            match extract_schema(&text) {
                Ok(schema) => {
                    if schema.is_none() {
                        debug!("{} has no schema", outcome.key);
                    }
                    schemas.push(schema);
                }
                Err(e) => {
                    log.record(ProbeStage::ExtractingSchemas, outcome.key, e);
                    schemas.push(None);
                }
            }
        }

        // ── Evaluate ──

        let capabilities = assess(template_keys.len(), &schemas);
        let undetermined = (!template_keys.is_empty() && templates_read == 0)
            || (!section_keys.is_empty() && sections_read == 0);
        let contains_block = if undetermined {
            info!(
                "{}: no readable templates or sections, block flags undetermined",
                ProbeStage::Evaluating
            );
            None
        } else {
            Some(evaluate(&schemas, &self.config.targets))
        };

        // ── Resolve preview ──

        let preview_url = match self
            .source
            .list_published_items(self.config.preview_limit.max(1))
            .await
        {
            Ok(items) => match first_published(&items) {
                Some(item) => editor_url(&shop.shop, theme.id, item),
                None => {
                    debug!("{}: no published items", ProbeStage::ResolvingPreview);
                    None
                }
            },
            Err(e) if self.config.preview_required && !e.is_not_found() => return Err(e),
            Err(e) => {
                log.record(ProbeStage::ResolvingPreview, "published items", e);
                None
            }
        };

        info!(
            "{}: theme {} sections_everywhere={} app_blocks={} in {:.1}s ({} degraded)",
            ProbeStage::Done,
            theme.id,
            capabilities.supports_sections_everywhere,
            capabilities.supports_app_blocks,
            start.elapsed().as_secs_f64(),
            log.entries.len()
        );

        Ok(ProbeRun {
            report: CapabilityReport {
                theme: Some(theme),
                supports_sections_everywhere: capabilities.supports_sections_everywhere,
                supports_app_blocks: capabilities.supports_app_blocks,
                contains_block,
                preview_url,
            },
            degradations: log.entries,
        })
    }
}

impl ProbeRun {
    /// HTTP status for the report under `config`.
    pub fn http_status(&self, config: &ProbeConfig) -> u16 {
        self.report.http_status(config.preview_required)
    }
}
