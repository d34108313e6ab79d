//! Audit data model
//!
//! Every value that crosses a component boundary lives here: the per-probe
//! reports, the flow bundle, the per-URL result, verdicts and the run record.
//! Failures are carried in-band, so each slot of a [`UrlResult`] is always
//! present even when the probe behind it failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::thresholds::Thresholds;

/// Note recorded when the flows directory does not exist
pub const NO_FLOWS_DIRECTORY: &str = "no flows directory";

/// Error recorded for a flow module without a callable entry point
pub const NO_ENTRY_EXPORTED: &str = "no default function exported";

/// Serialize whole numbers without a fractional part so `50.0` is written as `50`.
pub(crate) fn compact_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// In-band error record of a failed probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub error: String,
}

/// Outcome of a single probe: its typed report or an `{ "error": .. }` record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeOutcome<T> {
    /// The probe produced its report
    Completed(T),
    /// The probe failed, timed out or panicked
    Failed(ProbeFailure),
}

impl<T> ProbeOutcome<T> {
    /// Build a failed outcome from an error message
    pub fn failed(error: impl Into<String>) -> Self {
        ProbeOutcome::Failed(ProbeFailure {
            error: error.into(),
        })
    }

    /// The report, when the probe completed
    pub fn report(&self) -> Option<&T> {
        match self {
            ProbeOutcome::Completed(report) => Some(report),
            ProbeOutcome::Failed(_) => None,
        }
    }

    /// The error message, when the probe failed
    pub fn error(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Completed(_) => None,
            ProbeOutcome::Failed(failure) => Some(&failure.error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ProbeOutcome::Failed(_))
    }
}

impl<T> From<anyhow::Result<T>> for ProbeOutcome<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(report) => ProbeOutcome::Completed(report),
            Err(e) => ProbeOutcome::failed(format!("{:#}", e)),
        }
    }
}

/// Metrics collected by instrumenting a loaded page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetrics {
    /// Document title (empty when absent)
    pub title: String,
    /// Number of resource entries recorded by the page
    pub request_count: u64,
    /// Transferred bytes in KB, rounded to two decimals
    #[serde(rename = "transferKB")]
    pub transfer_kb: f64,
    /// Depth of the deepest element, `body` counted as 1
    pub dom_depth: u32,
    pub image_count: u64,
    /// Images with a missing or blank `alt` attribute
    pub images_without_alt: u64,
    pub script_count: u64,
    pub inline_scripts: u64,
    pub style_tag_count: u64,
    /// Main-thread task time reported by the browser, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_heap_used_size: Option<f64>,
}

/// Category scores of a synthetic audit, each in `0..=100`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditScores {
    pub performance: u32,
    pub accessibility: u32,
    pub best_practices: u32,
    pub seo: u32,
    pub pwa: u32,
}

/// Timing measures of a synthetic audit in milliseconds (`null` when unmeasured)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTimings {
    #[serde(default)]
    pub first_contentful_paint: Option<f64>,
    #[serde(default)]
    pub speed_index: Option<f64>,
    #[serde(default)]
    pub largest_contentful_paint: Option<f64>,
    #[serde(default)]
    pub time_to_interactive: Option<f64>,
    #[serde(default)]
    pub total_blocking_time: Option<f64>,
    #[serde(default)]
    pub cumulative_layout_shift: Option<f64>,
}

/// Synthetic performance/quality audit report
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntheticAudit {
    pub scores: AuditScores,
    #[serde(default)]
    pub timings: AuditTimings,
}

/// Maximum number of issues kept as examples in an accessibility scan
pub const MAX_ISSUE_EXAMPLES: usize = 10;

/// One accessibility issue reported by the scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityIssue {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// Automated accessibility scan report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityScan {
    pub issue_count: u64,
    #[serde(default)]
    pub examples: Vec<AccessibilityIssue>,
}

impl AccessibilityScan {
    /// Build a scan report from the full issue list, keeping the first examples
    pub fn from_issues(issues: Vec<AccessibilityIssue>) -> Self {
        let issue_count = issues.len() as u64;
        let examples = issues.into_iter().take(MAX_ISSUE_EXAMPLES).collect();
        Self {
            issue_count,
            examples,
        }
    }
}

/// Outcome of one flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Passed,
    Failed,
    Skipped,
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowStatus::Passed => write!(f, "passed"),
            FlowStatus::Failed => write!(f, "failed"),
            FlowStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of running a single flow file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRun {
    /// Flow file name as discovered
    pub file: String,
    pub status: FlowStatus,
    /// Value returned by the flow, kept opaque
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Execution time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// POSIX-style relative path of the failure screenshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl FlowRun {
    pub fn passed(file: impl Into<String>, result: Value, duration_ms: u64) -> Self {
        let result = if result.is_null() {
            Value::Bool(true)
        } else {
            result
        };
        Self {
            file: file.into(),
            status: FlowStatus::Passed,
            result: Some(result),
            error: None,
            duration: Some(duration_ms),
            screenshot: None,
        }
    }

    pub fn failed(
        file: impl Into<String>,
        error: impl Into<String>,
        screenshot: Option<String>,
    ) -> Self {
        Self {
            file: file.into(),
            status: FlowStatus::Failed,
            result: None,
            error: Some(error.into()),
            duration: None,
            screenshot,
        }
    }

    pub fn skipped(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: FlowStatus::Skipped,
            result: None,
            error: Some(reason.into()),
            duration: None,
            screenshot: None,
        }
    }
}

/// All flow outcomes for one URL
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowBundle {
    #[serde(default)]
    pub runs: Vec<FlowRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FlowBundle {
    pub fn with_runs(runs: Vec<FlowRun>) -> Self {
        Self {
            runs,
            note: None,
            error: None,
        }
    }

    /// Bundle returned when the flows directory is absent
    pub fn no_flows_directory() -> Self {
        Self {
            runs: Vec::new(),
            note: Some(NO_FLOWS_DIRECTORY.to_string()),
            error: None,
        }
    }

    /// Bundle returned when the runner could not execute any flow
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            runs: Vec::new(),
            note: None,
            error: Some(error.into()),
        }
    }

    pub fn count(&self, status: FlowStatus) -> usize {
        self.runs.iter().filter(|run| run.status == status).count()
    }

    /// Sum of recorded flow durations in milliseconds
    pub fn total_duration_ms(&self) -> u64 {
        self.runs.iter().filter_map(|run| run.duration).sum()
    }
}

/// Everything measured for one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlResult {
    pub url: String,
    pub page_instrumentation: ProbeOutcome<PageMetrics>,
    pub synthetic_audit: ProbeOutcome<SyntheticAudit>,
    pub accessibility_scan: ProbeOutcome<AccessibilityScan>,
    pub flows: FlowBundle,
}

/// A single failed threshold check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breach {
    pub key: String,
    #[serde(serialize_with = "compact_number")]
    pub actual: f64,
    #[serde(serialize_with = "compact_number")]
    pub limit: f64,
}

/// Pass/fail decision for one URL with the breaches behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub url: String,
    pub passed: bool,
    pub fails: Vec<Breach>,
}

impl Verdict {
    /// Build a verdict; `passed` holds exactly when there are no breaches
    pub fn new(url: impl Into<String>, fails: Vec<Breach>) -> Self {
        Self {
            url: url.into(),
            passed: fails.is_empty(),
            fails,
        }
    }
}

/// The immutable artifact produced by one orchestrator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Effective thresholds applied to every result
    pub thresholds: Thresholds,
    pub results: Vec<UrlResult>,
    pub verdicts: Vec<Verdict>,
}

impl RunRecord {
    /// Number of URLs whose verdict passed
    pub fn passed_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.passed).count()
    }

    pub fn all_passed(&self) -> bool {
        self.verdicts.iter().all(|v| v.passed)
    }

    /// Result and verdict for each URL, in input order
    pub fn entries(&self) -> impl Iterator<Item = (&UrlResult, &Verdict)> {
        self.results.iter().zip(self.verdicts.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_metrics() -> PageMetrics {
        PageMetrics {
            title: "Example".to_string(),
            request_count: 12,
            transfer_kb: 345.67,
            dom_depth: 9,
            image_count: 3,
            images_without_alt: 1,
            script_count: 4,
            inline_scripts: 2,
            style_tag_count: 1,
            task_duration: None,
            js_heap_used_size: None,
        }
    }

    #[test]
    fn test_failed_outcome_serializes_as_error_record() {
        let outcome: ProbeOutcome<SyntheticAudit> = ProbeOutcome::failed("chrome crashed");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, json!({ "error": "chrome crashed" }));
    }

    #[test]
    fn test_outcome_deserializes_either_shape() {
        let completed: ProbeOutcome<PageMetrics> =
            serde_json::from_value(serde_json::to_value(sample_metrics()).unwrap()).unwrap();
        assert_eq!(completed.report(), Some(&sample_metrics()));

        let failed: ProbeOutcome<PageMetrics> =
            serde_json::from_value(json!({ "error": "net::ERR_NAME_NOT_RESOLVED" })).unwrap();
        assert_eq!(failed.error(), Some("net::ERR_NAME_NOT_RESOLVED"));
        assert!(failed.is_failed());
    }

    #[test]
    fn test_page_metrics_wire_names() {
        let value = serde_json::to_value(sample_metrics()).unwrap();
        assert_eq!(value["requestCount"], json!(12));
        assert_eq!(value["transferKB"], json!(345.67));
        assert_eq!(value["imagesWithoutAlt"], json!(1));
        assert!(value.get("taskDuration").is_none());
    }

    #[test]
    fn test_timings_serialize_null_when_missing() {
        let audit = SyntheticAudit {
            scores: AuditScores {
                performance: 80,
                ..Default::default()
            },
            timings: AuditTimings {
                speed_index: Some(1234.5),
                ..Default::default()
            },
        };
        let value = serde_json::to_value(audit).unwrap();
        assert_eq!(value["scores"]["bestPractices"], json!(0));
        assert_eq!(value["timings"]["speedIndex"], json!(1234.5));
        assert!(value["timings"]["firstContentfulPaint"].is_null());
    }

    #[test]
    fn test_breach_numbers_are_compact() {
        let breach = Breach {
            key: "maxRequests".to_string(),
            actual: 50.0,
            limit: 10.0,
        };
        let value = serde_json::to_value(&breach).unwrap();
        assert_eq!(
            value,
            json!({ "key": "maxRequests", "actual": 50, "limit": 10 })
        );

        let fractional = Breach {
            key: "maxTransferKB".to_string(),
            actual: 4100.25,
            limit: 4000.0,
        };
        let value = serde_json::to_value(&fractional).unwrap();
        assert_eq!(value["actual"], json!(4100.25));
    }

    #[test]
    fn test_verdict_passed_iff_no_breaches() {
        assert!(Verdict::new("https://a.test", vec![]).passed);
        let failing = Verdict::new(
            "https://a.test",
            vec![Breach {
                key: "maxDomDepth".to_string(),
                actual: 61.0,
                limit: 60.0,
            }],
        );
        assert!(!failing.passed);
    }

    #[test]
    fn test_flow_run_null_result_becomes_true() {
        let run = FlowRun::passed("login.test.js", Value::Null, 42);
        assert_eq!(run.result, Some(Value::Bool(true)));
        assert_eq!(run.duration, Some(42));
    }

    #[test]
    fn test_flow_bundle_shapes() {
        let none = serde_json::to_value(FlowBundle::no_flows_directory()).unwrap();
        assert_eq!(none, json!({ "runs": [], "note": "no flows directory" }));

        let failed = serde_json::to_value(FlowBundle::failed("launch failed")).unwrap();
        assert_eq!(failed, json!({ "runs": [], "error": "launch failed" }));

        let run = serde_json::to_value(FlowRun::failed("x.test.js", "boom", None)).unwrap();
        assert_eq!(
            run,
            json!({ "file": "x.test.js", "status": "failed", "error": "boom" })
        );
    }

    #[test]
    fn test_accessibility_scan_keeps_ten_examples() {
        let issues = (0..14)
            .map(|i| AccessibilityIssue {
                code: format!("WCAG2AA.{}", i),
                message: "Img element missing an alt attribute".to_string(),
                selector: format!("img:nth-child({})", i),
                context: None,
            })
            .collect();
        let scan = AccessibilityScan::from_issues(issues);
        assert_eq!(scan.issue_count, 14);
        assert_eq!(scan.examples.len(), MAX_ISSUE_EXAMPLES);
    }
}
