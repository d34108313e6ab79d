//! Accessibility scan probe
//!
//! Runs the pa11y CLI with its JSON reporter. pa11y exits with code 2 when
//! it found issues, so any exit status with a parseable issue array counts as
//! a completed scan.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use webaudit_core::config::Pa11ySettings;
use webaudit_core::model::{AccessibilityIssue, AccessibilityScan, ProbeOutcome};
use webaudit_core::probe::{Probe, ProbeError, ProbeKind, Result};

use crate::subprocess::SubprocessExecutor;

const TOOL: &str = "pa11y";

/// Head start pa11y's own timeout gets over the probe budget
pub const TOOL_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

impl From<RawIssue> for AccessibilityIssue {
    fn from(raw: RawIssue) -> Self {
        AccessibilityIssue {
            code: raw.code,
            message: raw.message,
            selector: raw.selector.unwrap_or_default(),
            context: raw.context,
        }
    }
}

/// Parse pa11y's JSON reporter output into a scan report
pub fn parse_issues(raw: &str) -> Result<AccessibilityScan> {
    let issues: Vec<RawIssue> = serde_json::from_str(raw.trim()).map_err(|e| ProbeError::Parse {
        tool: TOOL.to_string(),
        reason: e.to_string(),
    })?;
    Ok(AccessibilityScan::from_issues(
        issues.into_iter().map(AccessibilityIssue::from).collect(),
    ))
}

/// Accessibility scan via the pa11y CLI
#[derive(Debug, Clone)]
pub struct Pa11yProbe {
    settings: Pa11ySettings,
    timeout: Duration,
}

impl Pa11yProbe {
    pub fn new(settings: Pa11ySettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }

    /// Budget handed to pa11y itself, short of the probe budget so pa11y
    /// reports its own timeout before the probe is cut off
    pub fn tool_timeout(&self) -> Duration {
        if self.timeout > TOOL_TIMEOUT_MARGIN * 2 {
            self.timeout - TOOL_TIMEOUT_MARGIN
        } else {
            self.timeout
        }
    }

    pub fn args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--reporter".to_string(),
            "json".to_string(),
            "--standard".to_string(),
            self.settings.standard.clone(),
            "--timeout".to_string(),
            self.tool_timeout().as_millis().to_string(),
        ];
        args.extend(self.settings.extra_args.iter().cloned());
        args.push(url.to_string());
        args
    }

    async fn run(&self, url: &str) -> Result<AccessibilityScan> {
        let result = SubprocessExecutor::execute_command(
            &self.settings.command,
            &self.args(url),
            Some(self.timeout),
        )
        .await?;

        match parse_issues(&result.stdout) {
            Ok(scan) => Ok(scan),
            Err(_) if !result.success => Err(ProbeError::ToolFailed {
                tool: TOOL.to_string(),
                status: result.status(),
                stderr: result.stderr_summary(),
            }),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Probe for Pa11yProbe {
    type Report = AccessibilityScan;

    fn kind(&self) -> ProbeKind {
        ProbeKind::AccessibilityScan
    }

    async fn probe(&self, url: &str) -> ProbeOutcome<AccessibilityScan> {
        self.run(url).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_issues_keeps_count_and_examples() {
        let issues: Vec<_> = (0..12)
            .map(|i| {
                json!({
                    "code": format!("WCAG2AA.Principle1.Guideline1_1.1_1_1.H37.{}", i),
                    "type": "error",
                    "typeCode": 1,
                    "message": "Img element missing an alt attribute.",
                    "context": "<img src=\"logo.png\">",
                    "selector": format!("#logo-{}", i),
                    "runner": "htmlcs"
                })
            })
            .collect();
        let raw = serde_json::to_string(&issues).unwrap();

        let scan = parse_issues(&raw).unwrap();
        assert_eq!(scan.issue_count, 12);
        assert_eq!(scan.examples.len(), 10);
        assert_eq!(scan.examples[0].selector, "#logo-0");
        assert_eq!(scan.examples[0].context.as_deref(), Some("<img src=\"logo.png\">"));
    }

    #[test]
    fn test_parse_empty_scan() {
        let scan = parse_issues("[]\n").unwrap();
        assert_eq!(scan.issue_count, 0);
        assert!(scan.examples.is_empty());
    }

    #[test]
    fn test_parse_issues_tolerates_null_fields() {
        let scan = parse_issues(r#"[{"code":"x","message":"y","selector":null,"context":null}]"#)
            .unwrap();
        assert_eq!(scan.examples[0].selector, "");
        assert_eq!(scan.examples[0].context, None);
    }

    #[test]
    fn test_parse_issues_rejects_non_array() {
        assert!(parse_issues("Error: net::ERR_NAME_NOT_RESOLVED").is_err());
    }

    #[test]
    fn test_args_put_url_last() {
        let probe = Pa11yProbe::new(Pa11ySettings::default(), Duration::from_secs(120));
        let args = probe.args("https://a.test");
        assert_eq!(
            args,
            vec![
                "--reporter",
                "json",
                "--standard",
                "WCAG2AA",
                "--timeout",
                "115000",
                "https://a.test"
            ]
        );
    }

    #[test]
    fn test_tool_timeout_fits_inside_probe_budget() {
        let probe = Pa11yProbe::new(Pa11ySettings::default(), Duration::from_secs(120));
        assert_eq!(probe.tool_timeout(), Duration::from_secs(115));
        assert!(probe.tool_timeout() < Duration::from_secs(120));

        // short budgets are passed through unchanged
        let short = Pa11yProbe::new(Pa11ySettings::default(), Duration::from_secs(8));
        assert_eq!(short.tool_timeout(), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_issues_with_nonzero_exit_still_complete() {
        // stands in for pa11y exiting 2 after printing its issues
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let script = dir.path().join("fake-pa11y.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '[{\"code\":\"c\",\"message\":\"m\",\"selector\":\"s\"}]'\nexit 2\n",
        )
        .unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let settings = Pa11ySettings {
            command: script.display().to_string(),
            ..Default::default()
        };
        let outcome = Pa11yProbe::new(settings, Duration::from_secs(5))
            .probe("https://a.test")
            .await;
        let scan = outcome.report().expect("scan should complete");
        assert_eq!(scan.issue_count, 1);
    }
}
