//! Threshold Engine
//!
//! A declarative policy of upper and lower bounds over named metrics. The
//! engine is pure over `(UrlResult, Thresholds)`: each rule in [`RULES`] reads
//! its metric from the result and compares it strictly against the limit.
//! Breaches are reported in rule-declaration order.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::model::{compact_number, Breach, UrlResult, Verdict};

pub const DEFAULT_MAX_REQUESTS: f64 = 200.0;
pub const DEFAULT_MAX_TRANSFER_KB: f64 = 4000.0;
pub const DEFAULT_MAX_DOM_DEPTH: f64 = 60.0;
pub const DEFAULT_MAX_IMAGES_WITHOUT_ALT: f64 = 0.0;
pub const DEFAULT_MIN_PERFORMANCE: f64 = 60.0;
pub const DEFAULT_MIN_ACCESSIBILITY: f64 = 70.0;

/// Errors raised while reading a thresholds file
#[derive(Error, Debug)]
pub enum ThresholdError {
    #[error("Failed to read thresholds file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid thresholds JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The complete, effective set of limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    #[serde(serialize_with = "compact_number")]
    pub max_requests: f64,
    #[serde(rename = "maxTransferKB", serialize_with = "compact_number")]
    pub max_transfer_kb: f64,
    #[serde(serialize_with = "compact_number")]
    pub max_dom_depth: f64,
    #[serde(serialize_with = "compact_number")]
    pub max_images_without_alt: f64,
    #[serde(serialize_with = "compact_number")]
    pub min_lighthouse_performance: f64,
    #[serde(serialize_with = "compact_number")]
    pub min_accessibility: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            max_transfer_kb: DEFAULT_MAX_TRANSFER_KB,
            max_dom_depth: DEFAULT_MAX_DOM_DEPTH,
            max_images_without_alt: DEFAULT_MAX_IMAGES_WITHOUT_ALT,
            min_lighthouse_performance: DEFAULT_MIN_PERFORMANCE,
            min_accessibility: DEFAULT_MIN_ACCESSIBILITY,
        }
    }
}

impl Thresholds {
    /// Defaults with the override applied per key
    pub fn effective(overrides: &ThresholdOverride) -> Self {
        Self::default().merge(overrides)
    }

    /// Shallow merge: every key present in the override wins
    pub fn merge(&self, overrides: &ThresholdOverride) -> Self {
        Self {
            max_requests: overrides.max_requests.unwrap_or(self.max_requests),
            max_transfer_kb: overrides.max_transfer_kb.unwrap_or(self.max_transfer_kb),
            max_dom_depth: overrides.max_dom_depth.unwrap_or(self.max_dom_depth),
            max_images_without_alt: overrides
                .max_images_without_alt
                .unwrap_or(self.max_images_without_alt),
            min_lighthouse_performance: overrides
                .min_lighthouse_performance
                .unwrap_or(self.min_lighthouse_performance),
            min_accessibility: overrides.min_accessibility.unwrap_or(self.min_accessibility),
        }
    }
}

/// Caller-supplied thresholds; unknown keys are ignored
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests: Option<f64>,
    #[serde(
        default,
        rename = "maxTransferKB",
        alias = "maxTransferKb",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_transfer_kb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dom_depth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_images_without_alt: Option<f64>,
    #[serde(
        default,
        alias = "minPerformance",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_lighthouse_performance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_accessibility: Option<f64>,
}

impl ThresholdOverride {
    pub fn from_json(raw: &str) -> Result<Self, ThresholdError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read an override from a JSON thresholds file
    pub fn from_file(path: &Path) -> Result<Self, ThresholdError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ThresholdError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

/// Direction of a bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Breached when the metric is strictly greater than the limit
    Upper,
    /// Breached when the metric is strictly lower than the limit
    Lower,
}

/// One entry of the policy table
#[derive(Clone, Copy)]
pub struct Rule {
    pub key: &'static str,
    pub bound: Bound,
    source: fn(&UrlResult) -> Option<f64>,
    limit: fn(&Thresholds) -> f64,
}

impl Rule {
    /// Measured value for this rule, `None` when the source probe failed
    pub fn measure(&self, result: &UrlResult) -> Option<f64> {
        (self.source)(result)
    }

    pub fn limit(&self, thresholds: &Thresholds) -> f64 {
        (self.limit)(thresholds)
    }

    /// Evaluate the rule; missing metrics are skipped for upper bounds and read as 0 for lower bounds
    pub fn check(&self, result: &UrlResult, thresholds: &Thresholds) -> Option<Breach> {
        let limit = self.limit(thresholds);
        let actual = match (self.bound, self.measure(result)) {
            (Bound::Upper, None) => return None,
            (Bound::Upper, Some(actual)) if actual > limit => actual,
            (Bound::Lower, measured) if measured.unwrap_or(0.0) < limit => {
                measured.unwrap_or(0.0)
            }
            _ => return None,
        };
        Some(Breach {
            key: self.key.to_string(),
            actual,
            limit,
        })
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("key", &self.key)
            .field("bound", &self.bound)
            .finish()
    }
}

fn request_count(result: &UrlResult) -> Option<f64> {
    result
        .page_instrumentation
        .report()
        .map(|m| m.request_count as f64)
}

fn transfer_kb(result: &UrlResult) -> Option<f64> {
    result.page_instrumentation.report().map(|m| m.transfer_kb)
}

fn dom_depth(result: &UrlResult) -> Option<f64> {
    result
        .page_instrumentation
        .report()
        .map(|m| m.dom_depth as f64)
}

fn images_without_alt(result: &UrlResult) -> Option<f64> {
    result
        .page_instrumentation
        .report()
        .map(|m| m.images_without_alt as f64)
}

fn performance_score(result: &UrlResult) -> Option<f64> {
    result
        .synthetic_audit
        .report()
        .map(|a| a.scores.performance as f64)
}

fn accessibility_score(result: &UrlResult) -> Option<f64> {
    result
        .synthetic_audit
        .report()
        .map(|a| a.scores.accessibility as f64)
}

/// The canonical policy, in declaration order
pub const RULES: [Rule; 6] = [
    Rule {
        key: "maxRequests",
        bound: Bound::Upper,
        source: request_count,
        limit: |t| t.max_requests,
    },
    Rule {
        key: "maxTransferKB",
        bound: Bound::Upper,
        source: transfer_kb,
        limit: |t| t.max_transfer_kb,
    },
    Rule {
        key: "maxDomDepth",
        bound: Bound::Upper,
        source: dom_depth,
        limit: |t| t.max_dom_depth,
    },
    Rule {
        key: "maxImagesWithoutAlt",
        bound: Bound::Upper,
        source: images_without_alt,
        limit: |t| t.max_images_without_alt,
    },
    Rule {
        key: "minLighthousePerformance",
        bound: Bound::Lower,
        source: performance_score,
        limit: |t| t.min_lighthouse_performance,
    },
    Rule {
        key: "minAccessibility",
        bound: Bound::Lower,
        source: accessibility_score,
        limit: |t| t.min_accessibility,
    },
];

/// Apply every rule to one result
pub fn apply_thresholds(result: &UrlResult, thresholds: &Thresholds) -> Verdict {
    let fails = RULES
        .iter()
        .filter_map(|rule| rule.check(result, thresholds))
        .collect();
    Verdict::new(result.url.clone(), fails)
}

/// Verdicts for a list of results, index-aligned with the input
pub fn evaluate_all(results: &[UrlResult], thresholds: &Thresholds) -> Vec<Verdict> {
    results
        .iter()
        .map(|result| apply_thresholds(result, thresholds))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AccessibilityScan, AuditScores, FlowBundle, PageMetrics, ProbeOutcome, SyntheticAudit,
    };
    use serde_json::json;

    fn measured(url: &str) -> UrlResult {
        UrlResult {
            url: url.to_string(),
            page_instrumentation: ProbeOutcome::Completed(PageMetrics {
                title: "A".to_string(),
                request_count: 50,
                transfer_kb: 100.0,
                dom_depth: 10,
                image_count: 2,
                images_without_alt: 0,
                script_count: 3,
                inline_scripts: 1,
                style_tag_count: 0,
                task_duration: None,
                js_heap_used_size: None,
            }),
            synthetic_audit: ProbeOutcome::Completed(SyntheticAudit {
                scores: AuditScores {
                    performance: 80,
                    accessibility: 90,
                    best_practices: 95,
                    seo: 100,
                    pwa: 30,
                },
                ..Default::default()
            }),
            accessibility_scan: ProbeOutcome::Completed(AccessibilityScan {
                issue_count: 0,
                examples: vec![],
            }),
            flows: FlowBundle::with_runs(vec![]),
        }
    }

    #[test]
    fn test_defaults() {
        let t = Thresholds::default();
        assert_eq!(t.max_requests, 200.0);
        assert_eq!(t.max_transfer_kb, 4000.0);
        assert_eq!(t.max_dom_depth, 60.0);
        assert_eq!(t.max_images_without_alt, 0.0);
        assert_eq!(t.min_lighthouse_performance, 60.0);
        assert_eq!(t.min_accessibility, 70.0);
    }

    #[test]
    fn test_override_merges_per_key_and_ignores_unknown() {
        let overrides = ThresholdOverride::from_json(
            r#"{ "maxRequests": 10, "minAccessibility": 95, "maxCookies": 3 }"#,
        )
        .unwrap();
        let t = Thresholds::effective(&overrides);
        assert_eq!(t.max_requests, 10.0);
        assert_eq!(t.min_accessibility, 95.0);
        assert_eq!(t.max_dom_depth, DEFAULT_MAX_DOM_DEPTH);

        let value = serde_json::to_value(t).unwrap();
        assert!(value.get("maxCookies").is_none());
        assert_eq!(value["maxRequests"], json!(10));
        assert_eq!(value["maxTransferKB"], json!(4000));
    }

    #[test]
    fn test_min_performance_alias() {
        let overrides = ThresholdOverride::from_json(r#"{ "minPerformance": 75 }"#).unwrap();
        assert_eq!(overrides.min_lighthouse_performance, Some(75.0));
    }

    #[test]
    fn test_passing_result_has_no_breaches() {
        let verdict = apply_thresholds(&measured("A"), &Thresholds::default());
        assert!(verdict.passed);
        assert!(verdict.fails.is_empty());
    }

    #[test]
    fn test_upper_bound_breach() {
        let overrides = ThresholdOverride {
            max_requests: Some(10.0),
            ..Default::default()
        };
        let verdict = apply_thresholds(&measured("A"), &Thresholds::effective(&overrides));
        assert!(!verdict.passed);
        assert_eq!(
            verdict.fails,
            vec![Breach {
                key: "maxRequests".to_string(),
                actual: 50.0,
                limit: 10.0,
            }]
        );
    }

    #[test]
    fn test_equal_to_limit_is_not_a_breach() {
        let overrides = ThresholdOverride {
            max_dom_depth: Some(10.0),
            min_lighthouse_performance: Some(80.0),
            ..Default::default()
        };
        let verdict = apply_thresholds(&measured("A"), &Thresholds::effective(&overrides));
        assert!(verdict.passed, "unexpected breaches: {:?}", verdict.fails);
    }

    #[test]
    fn test_failed_synthetic_audit_reads_as_zero() {
        let mut result = measured("B");
        result.synthetic_audit = ProbeOutcome::failed("lighthouse exited with status 1");
        let overrides = ThresholdOverride {
            min_lighthouse_performance: Some(50.0),
            ..Default::default()
        };
        let verdict = apply_thresholds(&result, &Thresholds::effective(&overrides));
        assert_eq!(
            verdict.fails,
            vec![
                Breach {
                    key: "minLighthousePerformance".to_string(),
                    actual: 0.0,
                    limit: 50.0,
                },
                Breach {
                    key: "minAccessibility".to_string(),
                    actual: 0.0,
                    limit: 70.0,
                },
            ]
        );
    }

    #[test]
    fn test_failed_instrumentation_skips_upper_bounds() {
        let mut result = measured("C");
        result.page_instrumentation = ProbeOutcome::failed("navigation timeout");
        let overrides = ThresholdOverride {
            max_requests: Some(0.0),
            max_transfer_kb: Some(0.0),
            ..Default::default()
        };
        let verdict = apply_thresholds(&result, &Thresholds::effective(&overrides));
        assert!(verdict.passed);
    }

    #[test]
    fn test_breaches_follow_rule_order() {
        let overrides = ThresholdOverride {
            max_requests: Some(1.0),
            max_transfer_kb: Some(1.0),
            max_dom_depth: Some(1.0),
            min_lighthouse_performance: Some(99.0),
            min_accessibility: Some(99.0),
            ..Default::default()
        };
        let verdict = apply_thresholds(&measured("D"), &Thresholds::effective(&overrides));
        let keys: Vec<&str> = verdict.fails.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "maxRequests",
                "maxTransferKB",
                "maxDomDepth",
                "minLighthousePerformance",
                "minAccessibility",
            ]
        );
    }

    #[test]
    fn test_evaluate_all_keeps_order() {
        let results = vec![measured("first"), measured("second")];
        let verdicts = evaluate_all(&results, &Thresholds::default());
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].url, "first");
        assert_eq!(verdicts[1].url, "second");
    }

    #[test]
    fn test_thresholds_file_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = ThresholdOverride::from_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ThresholdError::Io { .. })));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ maxRequests: ").unwrap();
        assert!(matches!(
            ThresholdOverride::from_file(&broken),
            Err(ThresholdError::Json(_))
        ));
    }
}
