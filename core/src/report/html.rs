//! HTML report rendering
//!
//! Pure functions from a run (or a flows-only bundle) to a self-contained
//! HTML document. Every interpolated value goes through [`escape`].

use std::fmt::Write;

use crate::model::{
    AccessibilityScan, FlowBundle, FlowStatus, PageMetrics, ProbeOutcome, RunRecord,
    SyntheticAudit, UrlResult, Verdict,
};
use crate::thresholds::Thresholds;

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; background: #f6f7f9; color: #222; }
main { max-width: 1200px; margin: 0 auto; padding: 24px; }
header { background: #2f3e75; color: #fff; padding: 24px; border-radius: 8px; }
header h1 { margin: 0 0 8px 0; }
section { background: #fff; border-radius: 8px; padding: 16px 24px; margin-top: 20px; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 6px 10px; border-bottom: 1px solid #e3e5e8; vertical-align: top; }
.cards { display: flex; flex-wrap: wrap; gap: 12px; }
.card { flex: 1 1 140px; border-radius: 6px; padding: 12px; text-align: center; background: #f0f2f5; }
.card .score { font-size: 2em; font-weight: 600; }
.good { color: #1b7f3b; } .average { color: #b26a00; } .poor { color: #c62828; }
.badge { display: inline-block; padding: 2px 8px; border-radius: 10px; font-size: .85em; color: #fff; }
.passed { background: #1b7f3b; } .failed { background: #c62828; } .skipped { background: #777; }
.error { color: #c62828; }
code { background: #f0f2f5; padding: 1px 4px; border-radius: 3px; }
"#;

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn score_class(score: u32) -> &'static str {
    match score {
        90..=u32::MAX => "good",
        50..=89 => "average",
        _ => "poor",
    }
}

fn status_badge(passed: bool) -> &'static str {
    if passed {
        r#"<span class="badge passed">PASSED</span>"#
    } else {
        r#"<span class="badge failed">FAILED</span>"#
    }
}

fn format_ms(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{:.0} ms", ms),
        None => "n/a".to_string(),
    }
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n<main>\n{}</main>\n</body>\n</html>\n",
        escape(title),
        STYLE,
        body
    )
}

fn render_thresholds(thresholds: &Thresholds, out: &mut String) {
    out.push_str("<section>\n<h2>Thresholds</h2>\n<table>\n");
    let value = serde_json::to_value(thresholds).unwrap_or_default();
    if let Some(map) = value.as_object() {
        for (key, limit) in map {
            let _ = writeln!(
                out,
                "<tr><th>{}</th><td>{}</td></tr>",
                escape(key),
                escape(&limit.to_string())
            );
        }
    }
    out.push_str("</table>\n</section>\n");
}

fn render_verdict(verdict: &Verdict, out: &mut String) {
    let _ = writeln!(out, "<h3>Verdict {}</h3>", status_badge(verdict.passed));
    if verdict.fails.is_empty() {
        return;
    }
    out.push_str("<table>\n<tr><th>Threshold</th><th>Actual</th><th>Limit</th></tr>\n");
    for breach in &verdict.fails {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&breach.key),
            breach.actual,
            breach.limit
        );
    }
    out.push_str("</table>\n");
}

fn render_probe_error(label: &str, error: &str, out: &mut String) {
    let _ = writeln!(
        out,
        "<h3>{}</h3>\n<p class=\"error\">{}</p>",
        escape(label),
        escape(error)
    );
}

fn render_synthetic(outcome: &ProbeOutcome<SyntheticAudit>, out: &mut String) {
    let audit = match outcome {
        ProbeOutcome::Completed(audit) => audit,
        ProbeOutcome::Failed(failure) => {
            return render_probe_error("Synthetic audit", &failure.error, out)
        }
    };

    out.push_str("<h3>Synthetic audit</h3>\n<div class=\"cards\">\n");
    let scores = &audit.scores;
    for (label, score) in [
        ("Performance", scores.performance),
        ("Accessibility", scores.accessibility),
        ("Best Practices", scores.best_practices),
        ("SEO", scores.seo),
        ("PWA", scores.pwa),
    ] {
        let _ = writeln!(
            out,
            "<div class=\"card\"><div class=\"score {}\">{}</div><div>{}</div></div>",
            score_class(score),
            score,
            label
        );
    }
    out.push_str("</div>\n<table>\n");

    let timings = &audit.timings;
    for (label, value) in [
        ("First Contentful Paint", format_ms(timings.first_contentful_paint)),
        ("Speed Index", format_ms(timings.speed_index)),
        ("Largest Contentful Paint", format_ms(timings.largest_contentful_paint)),
        ("Time to Interactive", format_ms(timings.time_to_interactive)),
        ("Total Blocking Time", format_ms(timings.total_blocking_time)),
        (
            "Cumulative Layout Shift",
            timings
                .cumulative_layout_shift
                .map(|v| format!("{:.3}", v))
                .unwrap_or_else(|| "n/a".to_string()),
        ),
    ] {
        let _ = writeln!(out, "<tr><th>{}</th><td>{}</td></tr>", label, value);
    }
    out.push_str("</table>\n");
}

fn render_metrics(outcome: &ProbeOutcome<PageMetrics>, out: &mut String) {
    let metrics = match outcome {
        ProbeOutcome::Completed(metrics) => metrics,
        ProbeOutcome::Failed(failure) => {
            return render_probe_error("Page metrics", &failure.error, out)
        }
    };

    out.push_str("<h3>Page metrics</h3>\n<table>\n");
    let rows = [
        ("Title", escape(&metrics.title)),
        ("Requests", metrics.request_count.to_string()),
        ("Transfer size", format!("{} KB", metrics.transfer_kb)),
        ("DOM depth", metrics.dom_depth.to_string()),
        ("Images", metrics.image_count.to_string()),
        ("Images without alt", metrics.images_without_alt.to_string()),
        ("Scripts", metrics.script_count.to_string()),
        ("Inline scripts", metrics.inline_scripts.to_string()),
        ("Style tags", metrics.style_tag_count.to_string()),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "<tr><th>{}</th><td>{}</td></tr>", label, value);
    }
    if let Some(task) = metrics.task_duration {
        let _ = writeln!(out, "<tr><th>Task duration</th><td>{:.3} s</td></tr>", task);
    }
    if let Some(heap) = metrics.js_heap_used_size {
        let _ = writeln!(
            out,
            "<tr><th>JS heap used</th><td>{:.1} MB</td></tr>",
            heap / (1024.0 * 1024.0)
        );
    }
    out.push_str("</table>\n");
}

fn render_accessibility(outcome: &ProbeOutcome<AccessibilityScan>, out: &mut String) {
    let scan = match outcome {
        ProbeOutcome::Completed(scan) => scan,
        ProbeOutcome::Failed(failure) => {
            return render_probe_error("Accessibility scan", &failure.error, out)
        }
    };

    let _ = writeln!(
        out,
        "<h3>Accessibility scan</h3>\n<p>{} issue(s) found</p>",
        scan.issue_count
    );
    if scan.examples.is_empty() {
        return;
    }
    out.push_str("<table>\n<tr><th>Code</th><th>Message</th><th>Selector</th></tr>\n");
    for issue in &scan.examples {
        let _ = writeln!(
            out,
            "<tr><td><code>{}</code></td><td>{}</td><td><code>{}</code></td></tr>",
            escape(&issue.code),
            escape(&issue.message),
            escape(&issue.selector)
        );
    }
    out.push_str("</table>\n");
}

fn render_flows(bundle: &FlowBundle, out: &mut String) {
    let _ = writeln!(
        out,
        "<h3>Flows</h3>\n<p>{} passed, {} failed, {} skipped, {} ms total</p>",
        bundle.count(FlowStatus::Passed),
        bundle.count(FlowStatus::Failed),
        bundle.count(FlowStatus::Skipped),
        bundle.total_duration_ms()
    );
    if let Some(note) = &bundle.note {
        let _ = writeln!(out, "<p>{}</p>", escape(note));
    }
    if let Some(error) = &bundle.error {
        let _ = writeln!(out, "<p class=\"error\">{}</p>", escape(error));
    }
    if bundle.runs.is_empty() {
        return;
    }

    out.push_str(
        "<table>\n<tr><th>Flow</th><th>Status</th><th>Duration</th><th>Error</th><th>Screenshot</th></tr>\n",
    );
    for run in &bundle.runs {
        let duration = run
            .duration
            .map(|ms| format!("{} ms", ms))
            .unwrap_or_default();
        let screenshot = run
            .screenshot
            .as_deref()
            .map(|path| {
                let path = escape(path);
                format!("<a href=\"{}\">{}</a>", path, path)
            })
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td><span class=\"badge {}\">{}</span></td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&run.file),
            run.status,
            run.status,
            duration,
            escape(run.error.as_deref().unwrap_or("")),
            screenshot
        );
    }
    out.push_str("</table>\n");
}

fn render_url(result: &UrlResult, verdict: &Verdict, out: &mut String) {
    let _ = writeln!(out, "<section>\n<h2>{}</h2>", escape(&result.url));
    render_verdict(verdict, out);
    render_synthetic(&result.synthetic_audit, out);
    render_metrics(&result.page_instrumentation, out);
    render_accessibility(&result.accessibility_scan, out);
    render_flows(&result.flows, out);
    out.push_str("</section>\n");
}

/// Render a full run
pub fn render_html(record: &RunRecord) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<header>\n<h1>Web Audit Report</h1>\n<p>Run <code>{}</code> &middot; started {} &middot; finished {}</p>\n\
         <p>{}/{} URL(s) passed {}</p>\n</header>",
        escape(&record.id),
        record.started_at.to_rfc3339(),
        record.finished_at.to_rfc3339(),
        record.passed_count(),
        record.verdicts.len(),
        status_badge(record.all_passed())
    );
    render_thresholds(&record.thresholds, &mut body);
    for (result, verdict) in record.entries() {
        render_url(result, verdict, &mut body);
    }
    document(&format!("Web Audit Report {}", record.id), &body)
}

/// Render a flows-only run
pub fn render_flow_bundle_html(url: &str, bundle: &FlowBundle) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<header>\n<h1>Flow Report</h1>\n<p>{}</p>\n</header>\n<section>",
        escape(url)
    );
    render_flows(bundle, &mut body);
    body.push_str("</section>\n");
    document(&format!("Flow Report - {}", url), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Breach, FlowRun};
    use chrono::Utc;

    fn record_with(url: &str, bundle: FlowBundle) -> RunRecord {
        RunRecord {
            id: "0123456789ab".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            thresholds: Thresholds::default(),
            results: vec![UrlResult {
                url: url.to_string(),
                page_instrumentation: ProbeOutcome::failed("navigation <timeout>"),
                synthetic_audit: ProbeOutcome::failed("lighthouse missing"),
                accessibility_scan: ProbeOutcome::failed("pa11y missing"),
                flows: bundle,
            }],
            verdicts: vec![Verdict::new(
                url,
                vec![Breach {
                    key: "minLighthousePerformance".to_string(),
                    actual: 0.0,
                    limit: 60.0,
                }],
            )],
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_render_html_escapes_and_lists_breaches() {
        let html = render_html(&record_with(
            "https://a.test/?q=<script>",
            FlowBundle::with_runs(vec![FlowRun::failed(
                "login.test.js",
                "expected <h1>",
                Some("screenshots/login.test.js-2026-01-01T00-00-00-000Z.png".to_string()),
            )]),
        ));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("0123456789ab"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("https://a.test/?q=&lt;script&gt;"));
        assert!(html.contains("minLighthousePerformance"));
        assert!(html.contains("navigation &lt;timeout&gt;"));
        assert!(html.contains("expected &lt;h1&gt;"));
        assert!(html.contains(
            "<a href=\"screenshots/login.test.js-2026-01-01T00-00-00-000Z.png\">"
        ));
    }

    #[test]
    fn test_render_flow_bundle_html_with_note() {
        let html = render_flow_bundle_html("https://a.test", &FlowBundle::no_flows_directory());
        assert!(html.contains("Flow Report"));
        assert!(html.contains("no flows directory"));
        assert!(!html.contains("<th>Flow</th>"));
    }

    #[test]
    fn test_score_class_bands() {
        assert_eq!(score_class(100), "good");
        assert_eq!(score_class(90), "good");
        assert_eq!(score_class(50), "average");
        assert_eq!(score_class(49), "poor");
    }
}
