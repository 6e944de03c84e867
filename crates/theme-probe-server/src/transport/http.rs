//! HTTP transport: axum server exposing the probe and /health.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use theme_probe::{AdminClient, ProbeError, ProbeOrchestrator, ProbeRun, ShopContext};

use crate::config::ServerConfig;

/// Shared server state passed to all handlers via axum State.
pub struct AppState {
    pub config: ServerConfig,
    /// Fires on shutdown; in-flight probes stop early.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    fn source(&self, shop: &ShopContext) -> AdminClient {
        let timeout = self.config.request_timeout_ms;
        match &self.config.api_base_url {
            Some(base) => AdminClient::with_base_url(base.as_str(), &shop.access_token, timeout),
            None => AdminClient::new(shop, &self.config.api_version, timeout),
        }
    }

    /// Run one probe against the configured shop.
    pub async fn probe(&self) -> Result<ProbeRun, ProbeError> {
        self.probe_shop(&self.config.shop).await
    }

    /// Run one probe against `shop`.
    pub async fn probe_shop(&self, shop: &ShopContext) -> Result<ProbeRun, ProbeError> {
        let orchestrator =
            ProbeOrchestrator::new(Arc::new(self.source(shop)), self.config.probe.clone());
        orchestrator.probe_with_cancel(shop, &self.shutdown).await
    }

    /// Shop named by the request, falling back to the configured one.
    ///
    /// The configured access token is used either way.
    fn shop_for(&self, requested: Option<&str>) -> ShopContext {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(shop) if shop != self.config.shop.shop => {
                ShopContext::new(shop, self.config.shop.access_token.as_str())
            }
            _ => self.config.shop.clone(),
        }
    }
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/store/themes/main", get(handle_probe))
        .layer(cors)
        .with_state(state)
}

/// HTTP server wrapping the router.
pub struct HttpTransport {
    state: Arc<AppState>,
}

impl HttpTransport {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(config)),
        }
    }

    /// Token that stops the server and any running probes when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// Serve until the shutdown token fires.
    pub async fn run(&self) -> anyhow::Result<()> {
        let addr = self.state.config.addr;
        let app = router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("HTTP transport listening on http://{addr}");

        let shutdown = self.shutdown_token();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("HTTP transport stopped");
        Ok(())
    }
}

// ── Handlers ────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ProbeQuery {
    shop: Option<String>,
}

/// Probe a shop's published theme; `?shop=` overrides the configured shop.
async fn handle_probe(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProbeQuery>,
) -> Response {
    let shop = state.shop_for(query.shop.as_deref());
    match state.probe_shop(&shop).await {
        Ok(run) => {
            let status = StatusCode::from_u16(run.http_status(&state.config.probe))
                .unwrap_or(StatusCode::OK);
            (status, Json(run.report)).into_response()
        }
        Err(e) => {
            error!("theme probe for {} failed: {e}", shop.shop);
            let status =
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
        }
    }
}

/// Health check endpoint.
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
