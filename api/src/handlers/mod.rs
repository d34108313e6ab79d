//! API Handlers Module
//!
//! Request handlers for the audit endpoints. Every failure reply carries the
//! `{ok: false, error}` body.

use axum::{
    debug_handler,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

use webaudit_core::orchestrator::AuditOrchestrator;
use webaudit_core::report::{project_run, render_html};
use webaudit_core::split_urls;
use webaudit_store::{HistoryStore, StoreError};

use crate::models::{AuditRequest, AuditResponse, ErrorResponse, HealthResponse, ResultsResponse};

/// Shared state of the API server
pub struct ApiState {
    /// Runs audits
    pub orchestrator: Arc<AuditOrchestrator>,
    /// Run history
    pub store: Arc<HistoryStore>,
}

/// Errors surfaced to HTTP callers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Audit form and run history page
const DASHBOARD_HTML: &str = include_str!("../../assets/dashboard.html");

/// Dashboard page
#[debug_handler]
pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// Health check endpoint
#[debug_handler]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Run an audit, persist it and return the record
#[debug_handler]
pub async fn run_audit(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<AuditRequest>, JsonRejection>,
) -> Result<Json<AuditResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let urls = request.url.as_deref().map(split_urls).unwrap_or_default();
    if urls.is_empty() {
        return Err(ApiError::BadRequest("url is required".to_string()));
    }
    tracing::debug!("Audit requested for {} URL(s)", urls.len());

    let overrides = request.thresholds.unwrap_or_default();
    let run = state.orchestrator.audit_all(&urls, &overrides).await;
    state.store.save(&run).await?;

    let simple = request.simple.then(|| project_run(&run));
    Ok(Json(AuditResponse {
        ok: true,
        run,
        simple,
    }))
}

/// Every stored run, newest first
#[debug_handler]
pub async fn list_results(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let results = state.store.load().await?;
    Ok(Json(ResultsResponse { ok: true, results }))
}

/// HTML report of the newest run
#[debug_handler]
pub async fn latest_report(State(state): State<Arc<ApiState>>) -> Result<Html<String>, ApiError> {
    match state.store.latest().await? {
        Some(run) => Ok(Html(render_html(&run))),
        None => Err(ApiError::NotFound("no runs recorded".to_string())),
    }
}
