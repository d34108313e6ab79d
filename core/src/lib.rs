//! WebAudit Core Module
//!
//! The core module holds everything that decides what an audit run is: the
//! data model, the probe and browser contracts, the flow runner, the
//! orchestrator that fans work out per URL, the threshold engine and the
//! run assembler. Reporting and configuration live here too so every
//! front-end renders and loads settings the same way.

pub mod browser;
pub mod config;
pub mod flows;
pub mod model;
pub mod orchestrator;
pub mod probe;
pub mod record;
pub mod report;
pub mod thresholds;

pub use browser::{BrowserError, BrowserLauncher, BrowserSession, Navigation, Page, Viewport};
pub use config::{AuditConfig, ConfigError};
pub use flows::{Flow, FlowError, FlowRegistry, FlowRunner, FlowRunnerConfig};
pub use model::{
    AccessibilityIssue, AccessibilityScan, AuditScores, AuditTimings, Breach, FlowBundle,
    FlowRun, FlowStatus, PageMetrics, ProbeOutcome, RunRecord, SyntheticAudit, UrlResult,
    Verdict,
};
pub use orchestrator::{AuditOrchestrator, FlowExecutor, ProbeSet};
pub use probe::{Probe, ProbeError, ProbeKind};
pub use thresholds::{apply_thresholds, ThresholdOverride, Thresholds};

/// Split a comma-separated URL list, trimming blanks
pub fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_urls() {
        assert_eq!(
            split_urls(" https://a.test, ,https://b.test,"),
            vec!["https://a.test".to_string(), "https://b.test".to_string()]
        );
        assert!(split_urls("  ").is_empty());
    }
}
