//! Probe Provider contract
//!
//! A probe audits a single URL and returns its typed report or an in-band
//! error record. [`run_probe`] is the boundary the orchestrator calls: it
//! bounds the probe in wall-clock time and turns a panic into a failed
//! outcome, so nothing a probe does can escape the contract.

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::browser::BrowserError;
use crate::model::ProbeOutcome;

/// Recommended upper bound for a single probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors raised inside a probe provider before they are recorded in-band
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{tool} failed with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} produced unreadable output: {reason}")]
    Parse { tool: String, reason: String },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for probe internals
pub type Result<T> = std::result::Result<T, ProbeError>;

impl<T> From<Result<T>> for ProbeOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(report) => ProbeOutcome::Completed(report),
            Err(e) => ProbeOutcome::failed(e.to_string()),
        }
    }
}

/// The three audit axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeKind {
    PageInstrumentation,
    SyntheticAudit,
    AccessibilityScan,
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::PageInstrumentation => write!(f, "page-instrumentation"),
            ProbeKind::SyntheticAudit => write!(f, "synthetic-audit"),
            ProbeKind::AccessibilityScan => write!(f, "accessibility-scan"),
        }
    }
}

/// A single-URL audit producing a typed report
///
/// Implementations must not share mutable state with other probes and
/// should encode every failure in the returned outcome.
#[async_trait]
pub trait Probe: Send + Sync {
    type Report: Send;

    fn kind(&self) -> ProbeKind;

    async fn probe(&self, url: &str) -> ProbeOutcome<Self::Report>;
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Run a probe within `timeout`, converting expiry and panics into failed outcomes
pub async fn run_probe<P>(probe: &P, url: &str, timeout: Duration) -> ProbeOutcome<P::Report>
where
    P: Probe + ?Sized,
{
    let kind = probe.kind();
    let start = Instant::now();
    debug!("Starting {} probe for {}", kind, url);

    let guarded = AssertUnwindSafe(probe.probe(url)).catch_unwind();
    let outcome = match tokio::time::timeout(timeout, guarded).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(payload)) => {
            let message = panic_message(payload);
            warn!("{} probe panicked for {}: {}", kind, url, message);
            ProbeOutcome::failed(format!("{} probe panicked: {}", kind, message))
        }
        Err(_) => {
            warn!(
                "{} probe timed out for {} after {}ms",
                kind,
                url,
                timeout.as_millis()
            );
            ProbeOutcome::failed(format!(
                "{} probe timed out after {}ms",
                kind,
                timeout.as_millis()
            ))
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    match outcome.error() {
        Some(error) => warn!(
            "{} probe failed for {} in {}ms: {}",
            kind, url, duration_ms, error
        ),
        None => info!("{} probe completed for {} in {}ms", kind, url, duration_ms),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowProbe;

    #[async_trait]
    impl Probe for SlowProbe {
        type Report = u32;

        fn kind(&self) -> ProbeKind {
            ProbeKind::SyntheticAudit
        }

        async fn probe(&self, _url: &str) -> ProbeOutcome<u32> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            ProbeOutcome::Completed(1)
        }
    }

    struct PanickingProbe;

    #[async_trait]
    impl Probe for PanickingProbe {
        type Report = u32;

        fn kind(&self) -> ProbeKind {
            ProbeKind::AccessibilityScan
        }

        async fn probe(&self, _url: &str) -> ProbeOutcome<u32> {
            panic!("scanner exploded");
        }
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed_outcome() {
        let outcome = run_probe(&SlowProbe, "https://a.test", Duration::from_millis(20)).await;
        let error = outcome.error().expect("timeout should fail the probe");
        assert!(error.contains("timed out after 20ms"), "got: {}", error);
    }

    #[tokio::test]
    async fn test_panic_becomes_failed_outcome() {
        let outcome = run_probe(&PanickingProbe, "https://a.test", DEFAULT_PROBE_TIMEOUT).await;
        let error = outcome.error().expect("panic should fail the probe");
        assert!(error.contains("scanner exploded"), "got: {}", error);
    }

    #[test]
    fn test_probe_error_becomes_failed_outcome() {
        let result: Result<u32> = Err(ProbeError::ToolFailed {
            tool: "pa11y".to_string(),
            status: "exit code 1".to_string(),
            stderr: "Chrome not found".to_string(),
        });
        let outcome: ProbeOutcome<u32> = result.into();
        assert_eq!(
            outcome.error(),
            Some("pa11y failed with exit code 1: Chrome not found")
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ProbeKind::PageInstrumentation.to_string(), "page-instrumentation");
    }
}
