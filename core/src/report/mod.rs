//! Reporting
//!
//! HTML rendering of runs and flow bundles, plus the flat pass/fail
//! projection used by terminal output and dashboards.

pub mod html;
pub mod simple;

use std::path::Path;
use thiserror::Error;
use tracing::info;

pub use html::{render_flow_bundle_html, render_html};
pub use simple::{
    flow_test_name, format_as_json, format_as_text, project_flows, project_run, SimpleResult,
    SimpleStatus, SIMPLE_SCORE_BAR,
};

/// Report output errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Write a rendered report, creating parent directories as needed
pub async fn write_report(path: &Path, html: &str) -> Result<(), ReportError> {
    let wrap = |source| ReportError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    tokio::fs::write(path, html).await.map_err(wrap)?;

    info!("Report written to {}", path.display());
    Ok(())
}
