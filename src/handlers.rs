use crate::errors::AppError;
use crate::models::{EnrichRequest, EvaluateRequest, SearchQuery};
use crate::pipeline::LeadPipeline;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lead pipeline with its storage and external clients.
    pub pipeline: LeadPipeline,
}

/// Routes under `/api/v1/leads`.
///
/// Layers (rate limiting, tracing, CORS) are applied by the caller.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/leads", get(list_leads))
        .route("/api/v1/leads/search", post(search_leads))
        .route("/api/v1/leads/enrich", post(enrich_leads))
        .route("/api/v1/leads/evaluate", post(evaluate_leads))
        .route("/api/v1/leads/export", post(export_leads).get(export_leads))
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-scout",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/v1/leads
///
/// Returns every stored lead, most recently updated first, as `{"data": [...]}`.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let leads = state.pipeline.list().await?;
    tracing::debug!("GET /leads - {} leads", leads.len());

    Ok(Json(json!({ "data": leads })))
}

/// POST /api/v1/leads/search
///
/// Scrapes the directory for `industry` in `location` and stores the results.
/// Clients re-fetch the list afterwards.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - `{"industry": "...", "location": "..."}`.
pub async fn search_leads(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!(
        "POST /leads/search - industry='{}' location='{}'",
        payload.industry,
        payload.location
    );

    let stored = state.pipeline.search(&payload).await?;
    tracing::info!("Search stored {} new or changed leads", stored);

    Ok(Json(json!({ "status": "success" })))
}

/// POST /api/v1/leads/enrich
///
/// Enriches the leads stored under the given domains. Provider outages do not
/// fail the request; the outcome is logged.
pub async fn enrich_leads(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EnrichRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /leads/enrich - {} domains", payload.domains.len());

    state.pipeline.enrich(&payload.domains).await?;

    Ok(Json(json!({ "status": "success" })))
}

/// POST /api/v1/leads/evaluate
///
/// Scores the leads with the given ids. Fails as a whole if the scoring
/// output cannot be validated.
pub async fn evaluate_leads(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EvaluateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /leads/evaluate - {} ids", payload.ids.len());

    let scored = state.pipeline.evaluate(&payload.ids).await?;
    tracing::info!("Scored {} leads", scored);

    Ok(Json(json!({ "status": "success" })))
}

/// POST /api/v1/leads/export
///
/// Downloads the current lead list as `leads.csv`.
pub async fn export_leads(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let csv = state.pipeline.export().await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"leads.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
