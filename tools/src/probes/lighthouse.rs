//! Synthetic audit probe
//!
//! Runs the Lighthouse CLI, which launches its own headless Chrome, and maps
//! the JSON report onto [`SyntheticAudit`].

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use webaudit_core::config::LighthouseSettings;
use webaudit_core::model::{AuditScores, AuditTimings, ProbeOutcome, SyntheticAudit};
use webaudit_core::probe::{Probe, ProbeError, ProbeKind, Result};

use crate::subprocess::SubprocessExecutor;

const TOOL: &str = "lighthouse";

/// Synthetic audit via the Lighthouse CLI
#[derive(Debug, Clone)]
pub struct LighthouseProbe {
    settings: LighthouseSettings,
    timeout: Duration,
}

impl LighthouseProbe {
    pub fn new(settings: LighthouseSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }

    /// Command-line arguments for auditing `url`
    pub fn args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            url.to_string(),
            "--output=json".to_string(),
            "--output-path=stdout".to_string(),
            "--quiet".to_string(),
            format!("--chrome-flags={}", self.settings.chrome_flags),
        ];
        if !self.settings.categories.is_empty() {
            args.push(format!(
                "--only-categories={}",
                self.settings.categories.join(",")
            ));
        }
        args.extend(self.settings.extra_args.iter().cloned());
        args
    }

    async fn run(&self, url: &str) -> Result<SyntheticAudit> {
        let result = SubprocessExecutor::execute_command(
            &self.settings.command,
            &self.args(url),
            Some(self.timeout),
        )
        .await?;

        if !result.success {
            return Err(ProbeError::ToolFailed {
                tool: TOOL.to_string(),
                status: result.status(),
                stderr: result.stderr_summary(),
            });
        }

        debug!("Lighthouse report for {} is {} bytes", url, result.stdout.len());
        parse_report(&result.stdout)
    }
}

#[async_trait]
impl Probe for LighthouseProbe {
    type Report = SyntheticAudit;

    fn kind(&self) -> ProbeKind {
        ProbeKind::SyntheticAudit
    }

    async fn probe(&self, url: &str) -> ProbeOutcome<SyntheticAudit> {
        self.run(url).await.into()
    }
}

fn category_score(report: &Value, category: &str) -> u32 {
    let score = report["categories"][category]["score"]
        .as_f64()
        .unwrap_or(0.0);
    (score * 100.0).round().clamp(0.0, 100.0) as u32
}

fn audit_value(report: &Value, audit: &str) -> Option<f64> {
    report["audits"][audit]["numericValue"]
        .as_f64()
        .filter(|value| *value != 0.0)
}

/// Map a Lighthouse JSON report onto scores and timings
///
/// Missing category scores read as 0; missing or zero timings read as unmeasured.
pub fn parse_report(raw: &str) -> Result<SyntheticAudit> {
    let report: Value = serde_json::from_str(raw).map_err(|e| ProbeError::Parse {
        tool: TOOL.to_string(),
        reason: e.to_string(),
    })?;

    if !report.is_object() {
        return Err(ProbeError::Parse {
            tool: TOOL.to_string(),
            reason: "report is not a JSON object".to_string(),
        });
    }

    if let Some(runtime_error) = report.get("runtimeError") {
        let code = runtime_error["code"].as_str().unwrap_or("UNKNOWN");
        let message = runtime_error["message"].as_str().unwrap_or_default();
        return Err(ProbeError::Parse {
            tool: TOOL.to_string(),
            reason: format!("runtime error {}: {}", code, message),
        });
    }

    Ok(SyntheticAudit {
        scores: AuditScores {
            performance: category_score(&report, "performance"),
            accessibility: category_score(&report, "accessibility"),
            best_practices: category_score(&report, "best-practices"),
            seo: category_score(&report, "seo"),
            pwa: category_score(&report, "pwa"),
        },
        timings: AuditTimings {
            first_contentful_paint: audit_value(&report, "first-contentful-paint"),
            speed_index: audit_value(&report, "speed-index"),
            largest_contentful_paint: audit_value(&report, "largest-contentful-paint"),
            time_to_interactive: audit_value(&report, "interactive"),
            total_blocking_time: audit_value(&report, "total-blocking-time"),
            cumulative_layout_shift: audit_value(&report, "cumulative-layout-shift"),
        },
    })
}
