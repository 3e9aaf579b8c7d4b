use axum::{
    extract::{Path, Query},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Extension, Router,
};
use hyper::Server;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app::ports::ListingStorePort;
use crate::app::scrape_use_case::ScrapeUseCase;
use crate::error::ScraperError;
use crate::query::{DashboardSummary, ListingFilter, ListingOverride};

const DEFAULT_TRIGGER: &str = "dashboard";

#[derive(Clone)]
pub struct AppState {
    pub scrape: Arc<ScrapeUseCase>,
    pub store: Arc<dyn ListingStorePort>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest {
    triggered_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeResponse {
    run_id: String,
    started_at: chrono::DateTime<chrono::Utc>,
    completed_at: chrono::DateTime<chrono::Utc>,
    processed_listings: usize,
    error_count: usize,
    errors: Vec<String>,
}

/// Maps crate errors onto `{ "error": message }` bodies.
struct ApiError(ScraperError);

impl From<ScraperError> for ApiError {
    fn from(e: ScraperError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ScraperError::NotFound(_) => StatusCode::NOT_FOUND,
            ScraperError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "afriscan-scraper",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// A missing or malformed body falls back to the default trigger.
async fn trigger_scrape(
    Extension(state): Extension<AppState>,
    body: Option<Json<ScrapeRequest>>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    let triggered_by = body
        .and_then(|Json(b)| b.triggered_by)
        .unwrap_or_else(|| DEFAULT_TRIGGER.to_string());
    let result = state.scrape.run_scrape(&triggered_by).await?;
    Ok(Json(ScrapeResponse {
        run_id: result.run_id,
        started_at: result.started_at,
        completed_at: result.completed_at,
        processed_listings: result.listings.len(),
        error_count: result.errors.len(),
        errors: result.errors,
    }))
}

async fn list_properties(
    Extension(state): Extension<AppState>,
    Query(filter): Query<ListingFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let listings = state.store.list_listings().await?;
    Ok(Json(filter.apply(listings)))
}

async fn override_property(
    Extension(state): Extension<AppState>,
    Path(hash): Path<String>,
    Json(patch): Json<ListingOverride>,
) -> Result<impl IntoResponse, ApiError> {
    let mut stored = state
        .store
        .get_listing(&hash)
        .await?
        .ok_or_else(|| ScraperError::NotFound(hash.clone()))?;
    if patch.is_empty() {
        return Err(ScraperError::Config("override has no fields".into()).into());
    }
    patch.apply(&mut stored);
    state.store.replace_listing(&stored).await?;
    info!(hash = %hash, "Applied manual override");
    Ok(Json(stored))
}

async fn summary(Extension(state): Extension<AppState>) -> Result<impl IntoResponse, ApiError> {
    let listings = state.store.list_listings().await?;
    Ok(Json(DashboardSummary::from_listings(&listings)))
}

async fn list_runs(Extension(state): Extension<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_runs().await?))
}

async fn metrics_text() -> impl IntoResponse {
    match crate::metrics::render() {
        Some(body) => (StatusCode::OK, body),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Create the HTTP server with all routes
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/api/scrape", post(trigger_scrape))
        .route("/api/properties", get(list_properties))
        .route("/api/properties/:hash", patch(override_property))
        .route("/api/summary", get(summary))
        .route("/api/runs", get(list_runs))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_server(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("🚀 HTTP server running on http://localhost:{port}");
    info!("💚 Health check: http://localhost:{port}/health");

    Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}
