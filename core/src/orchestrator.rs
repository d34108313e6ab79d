//! Audit Orchestrator
//!
//! Produces a [`RunRecord`] for a list of URLs and a threshold override.
//!
//! Per URL, in input order:
//! 1. The three probes run concurrently and are joined when all settle
//! 2. The flow executor runs afterwards, so browser processes of probes and
//!    flows never overlap for the same URL
//! 3. The outcomes are merged into a [`UrlResult`]
//!
//! Verdicts are computed against the effective thresholds once every URL is
//! done. Nothing in here fails: probe errors, timeouts and panics, and flow
//! executor errors are all recorded in-band.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::model::{
    AccessibilityScan, FlowBundle, PageMetrics, RunRecord, SyntheticAudit, UrlResult,
};
use crate::probe::{panic_message, run_probe, Probe, DEFAULT_PROBE_TIMEOUT};
use crate::record::RunAssembler;
use crate::thresholds::{evaluate_all, ThresholdOverride, Thresholds};

/// Runs the behavioral flows for a URL
#[async_trait]
pub trait FlowExecutor: Send + Sync {
    async fn run_flows(&self, url: &str) -> anyhow::Result<FlowBundle>;
}

/// The three probe providers run for every URL
#[derive(Clone)]
pub struct ProbeSet {
    pub instrumentation: Arc<dyn Probe<Report = PageMetrics>>,
    pub synthetic: Arc<dyn Probe<Report = SyntheticAudit>>,
    pub accessibility: Arc<dyn Probe<Report = AccessibilityScan>>,
}

/// Fans out probes and flows per URL and assembles the run
pub struct AuditOrchestrator {
    probes: ProbeSet,
    flows: Arc<dyn FlowExecutor>,
    probe_timeout: Duration,
}

impl AuditOrchestrator {
    pub fn new(probes: ProbeSet, flows: Arc<dyn FlowExecutor>) -> Self {
        Self {
            probes,
            flows,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the per-probe wall-clock budget
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn flows(&self) -> Arc<dyn FlowExecutor> {
        self.flows.clone()
    }

    /// Audit every URL and evaluate the verdicts
    pub async fn audit_all(&self, urls: &[String], overrides: &ThresholdOverride) -> RunRecord {
        let run = RunAssembler::start();
        info!("Starting audit run {} for {} URL(s)", run.id(), urls.len());

        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            results.push(self.audit_url(url).await);
        }

        let thresholds = Thresholds::effective(overrides);
        let verdicts = evaluate_all(&results, &thresholds);
        let record = run.finish(thresholds, results, verdicts);

        info!(
            "Audit run {} finished: {}/{} URL(s) passed",
            record.id,
            record.passed_count(),
            record.verdicts.len()
        );
        record
    }

    /// Run all probes, then the flows, for one URL
    pub async fn audit_url(&self, url: &str) -> UrlResult {
        info!("Auditing {}", url);

        let (page_instrumentation, synthetic_audit, accessibility_scan) = tokio::join!(
            run_probe(self.probes.instrumentation.as_ref(), url, self.probe_timeout),
            run_probe(self.probes.synthetic.as_ref(), url, self.probe_timeout),
            run_probe(self.probes.accessibility.as_ref(), url, self.probe_timeout),
        );

        let flows = self.run_flows_guarded(url).await;

        UrlResult {
            url: url.to_string(),
            page_instrumentation,
            synthetic_audit,
            accessibility_scan,
            flows,
        }
    }

    async fn run_flows_guarded(&self, url: &str) -> FlowBundle {
        match AssertUnwindSafe(self.flows.run_flows(url))
            .catch_unwind()
            .await
        {
            Ok(Ok(bundle)) => bundle,
            Ok(Err(e)) => {
                error!("Flow runner failed for {}: {:#}", url, e);
                FlowBundle::failed(format!("{:#}", e))
            }
            Err(payload) => {
                let message = panic_message(payload);
                error!("Flow runner panicked for {}: {}", url, message);
                FlowBundle::failed(message)
            }
        }
    }
}
