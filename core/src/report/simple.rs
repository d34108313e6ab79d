//! Simple result projection
//!
//! Flattens a run (or a flows-only bundle) into `{testName, status}` rows for
//! dashboards and terminal output.

use serde::{Deserialize, Serialize};

use crate::model::{FlowBundle, FlowRun, FlowStatus, RunRecord, UrlResult};

/// Score a synthetic category needs to count as passed
pub const SIMPLE_SCORE_BAR: u32 = 90;

const RULE_WIDTH: usize = 50;

/// Pass/fail status of a projected check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SimpleStatus {
    Passed,
    Failed,
}

impl SimpleStatus {
    fn from_bool(passed: bool) -> Self {
        if passed {
            SimpleStatus::Passed
        } else {
            SimpleStatus::Failed
        }
    }
}

impl std::fmt::Display for SimpleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimpleStatus::Passed => write!(f, "PASSED"),
            SimpleStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// One projected check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResult {
    pub test_name: String,
    pub status: SimpleStatus,
}

impl SimpleResult {
    fn new(test_name: impl Into<String>, passed: bool) -> Self {
        Self {
            test_name: test_name.into(),
            status: SimpleStatus::from_bool(passed),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == SimpleStatus::Passed
    }
}

/// Display name of a flow file: `form-contact.test.js` becomes `FORM CONTACT`
pub fn flow_test_name(file: &str) -> String {
    file.replacen(".test.js", "", 1)
        .replacen('-', " ", 1)
        .to_uppercase()
}

fn flow_passed(run: &FlowRun) -> bool {
    run.status == FlowStatus::Passed
}

fn project_url(result: &UrlResult, out: &mut Vec<SimpleResult>) {
    let url = &result.url;

    if let Some(audit) = result.synthetic_audit.report() {
        let scores = &audit.scores;
        for (label, score) in [
            ("Performance", scores.performance),
            ("Accessibility", scores.accessibility),
            ("Best Practices", scores.best_practices),
            ("SEO", scores.seo),
        ] {
            out.push(SimpleResult::new(
                format!("Lighthouse {} ({})", label, url),
                score >= SIMPLE_SCORE_BAR,
            ));
        }
    }

    let scan_clean = result
        .accessibility_scan
        .report()
        .map(|scan| scan.issue_count == 0)
        .unwrap_or(false);
    out.push(SimpleResult::new(
        format!("Pa11y Accessibility ({})", url),
        scan_clean,
    ));

    for run in &result.flows.runs {
        out.push(SimpleResult::new(
            format!("{} ({})", flow_test_name(&run.file), url),
            flow_passed(run),
        ));
    }
}

/// Project every URL of a run
pub fn project_run(record: &RunRecord) -> Vec<SimpleResult> {
    let mut out = Vec::new();
    for result in &record.results {
        project_url(result, &mut out);
    }
    out
}

/// Project a flows-only bundle
pub fn project_flows(bundle: &FlowBundle) -> Vec<SimpleResult> {
    bundle
        .runs
        .iter()
        .map(|run| SimpleResult::new(flow_test_name(&run.file), flow_passed(run)))
        .collect()
}

/// Human-readable listing with a summary line
pub fn format_as_text(results: &[SimpleResult]) -> String {
    if results.is_empty() {
        return "No test results found.".to_string();
    }

    let rule = "=".repeat(RULE_WIDTH);
    let mut output = format!("TEST RESULTS:\n{}\n", rule);
    for result in results {
        let icon = if result.passed() { "✅" } else { "❌" };
        output.push_str(&format!("{} {}: {}\n", icon, result.test_name, result.status));
    }

    let passed = results.iter().filter(|r| r.passed()).count();
    let failed = results.len() - passed;
    output.push_str(&format!(
        "\n{}\nSUMMARY: {}/{} tests passed ({} failed)\n",
        rule,
        passed,
        results.len(),
        failed
    ));
    output
}

/// Pretty-printed JSON array
pub fn format_as_json(results: &[SimpleResult]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}
