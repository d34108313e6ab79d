//! API Server Module
//!
//! Router construction and the listener loop.

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use webaudit_core::orchestrator::AuditOrchestrator;
use webaudit_store::HistoryStore;

use crate::handlers::{
    dashboard, health_check, latest_report, list_results, run_audit, ApiState,
};
use crate::models::ApiConfig;

/// Main API server
pub struct ApiServer {
    /// Server configuration
    config: ApiConfig,
    /// Shared state
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: ApiConfig,
        orchestrator: Arc<AuditOrchestrator>,
        store: Arc<HistoryStore>,
    ) -> Self {
        let state = Arc::new(ApiState {
            orchestrator,
            store,
        });

        Self { config, state }
    }

    /// The application with all routes and layers
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(dashboard))
            .route("/audit", post(run_audit))
            .route("/results", get(list_results))
            .route("/report", get(latest_report))
            .route("/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the API server
    pub async fn start(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!("WebAudit API server listening on {}", addr);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start API server: {}", e))?;

        Ok(())
    }
}
