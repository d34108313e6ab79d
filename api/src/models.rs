//! API Models Module
//!
//! Request and response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};

use webaudit_core::config::ServerSettings;
use webaudit_core::model::RunRecord;
use webaudit_core::report::SimpleResult;
use webaudit_core::thresholds::ThresholdOverride;

/// Server bind configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ApiConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
        }
    }
}

/// Body of `POST /audit`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditRequest {
    /// One URL or a comma-separated list
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thresholds: Option<ThresholdOverride>,
    /// Also return the simple pass/fail projection
    #[serde(default)]
    pub simple: bool,
}

/// Successful `POST /audit` reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResponse {
    pub ok: bool,
    pub run: RunRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple: Option<Vec<SimpleResult>>,
}

/// `GET /results` reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub ok: bool,
    pub results: Vec<RunRecord>,
}

/// Failure reply shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

/// `GET /health` reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
