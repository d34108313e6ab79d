//! Flow Runner
//!
//! Runs every discovered flow for one URL against a single shared browser
//! session and page:
//! - The flows directory is checked before anything is launched
//! - The page is re-navigated to the URL before each flow
//! - A failing flow gets a full-page screenshot (best-effort) and never
//!   stops the remaining flows
//! - Page, context and browser are released on every exit path, panics included

use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::{discover_flows, FlowError, FlowFile, FlowRegistry};
use crate::browser::{
    BrowserLauncher, BrowserSession, Navigation, Page, Viewport, DEFAULT_NAVIGATION_TIMEOUT,
};
use crate::model::{FlowBundle, FlowRun, FlowStatus};
use crate::probe::panic_message;

/// Flow runner settings
#[derive(Debug, Clone)]
pub struct FlowRunnerConfig {
    /// Directory scanned for flow files; `None` means no flows
    pub flows_dir: Option<PathBuf>,
    /// Where failure screenshots are written, created on first use
    pub screenshots_dir: PathBuf,
    pub viewport: Viewport,
    /// Budget for the per-flow navigation to the audited URL
    pub navigation_timeout: Duration,
}

impl Default for FlowRunnerConfig {
    fn default() -> Self {
        Self {
            flows_dir: Some(PathBuf::from("tests/flows")),
            screenshots_dir: PathBuf::from("screenshots"),
            viewport: Viewport::default(),
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }
}

/// Filesystem-safe ISO-8601 timestamp: colons and the fraction dot become dashes
pub fn screenshot_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Runs flows against a shared browser session
pub struct FlowRunner {
    launcher: Arc<dyn BrowserLauncher>,
    registry: Arc<FlowRegistry>,
    config: FlowRunnerConfig,
}

impl FlowRunner {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        registry: Arc<FlowRegistry>,
        config: FlowRunnerConfig,
    ) -> Self {
        Self {
            launcher,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &FlowRunnerConfig {
        &self.config
    }

    /// Run every flow for `url`
    ///
    /// Never fails: discovery and launch problems are reported in the bundle.
    pub async fn run_for_url(&self, url: &str) -> FlowBundle {
        let Some(flows_dir) = self.config.flows_dir.as_ref() else {
            return FlowBundle::no_flows_directory();
        };

        let files = match discover_flows(flows_dir).await {
            Ok(Some(files)) => files,
            Ok(None) => {
                info!("No flows directory at {}", flows_dir.display());
                return FlowBundle::no_flows_directory();
            }
            Err(e) => {
                error!("Failed to read flows directory {}: {}", flows_dir.display(), e);
                return FlowBundle::failed(format!(
                    "failed to read flows directory {}: {}",
                    flows_dir.display(),
                    e
                ));
            }
        };

        info!("Running {} flow(s) for {}", files.len(), url);

        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                error!("Browser launch failed for flows on {}: {}", url, e);
                return FlowBundle::failed(e.to_string());
            }
        };

        let outcome = AssertUnwindSafe(self.run_in_session(session.as_mut(), url, &files))
            .catch_unwind()
            .await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }

        match outcome {
            Ok(Ok(runs)) => {
                let bundle = FlowBundle::with_runs(runs);
                info!(
                    "Flows for {}: {} passed, {} failed, {} skipped",
                    url,
                    bundle.count(FlowStatus::Passed),
                    bundle.count(FlowStatus::Failed),
                    bundle.count(FlowStatus::Skipped)
                );
                bundle
            }
            Ok(Err(e)) => {
                error!("Flow session failed for {}: {}", url, e);
                FlowBundle::failed(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload);
                error!("Flow runner panicked for {}: {}", url, message);
                FlowBundle::failed(format!("flow runner panicked: {}", message))
            }
        }
    }

    async fn run_in_session(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        files: &[FlowFile],
    ) -> crate::browser::Result<Vec<FlowRun>> {
        let mut page = session.new_page(self.config.viewport).await?;

        let mut runs = Vec::with_capacity(files.len());
        for file in files {
            runs.push(self.run_one(page.as_mut(), url, file).await);
        }

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }
        Ok(runs)
    }

    async fn run_one(&self, page: &mut dyn Page, url: &str, file: &FlowFile) -> FlowRun {
        let flow = self.registry.resolve(file);
        debug!("Running flow {} against {}", file.name, url);

        let navigation = Navigation::initial(self.config.navigation_timeout);
        let result = match page.goto(url, navigation).await {
            Ok(()) => {
                let start = Instant::now();
                match AssertUnwindSafe(flow.run(&mut *page, url))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(value)) => Ok((value, start.elapsed().as_millis() as u64)),
                    Ok(Err(e)) => Err(e),
                    Err(payload) => Err(FlowError::Failed(panic_message(payload))),
                }
            }
            Err(e) => Err(FlowError::from(e)),
        };

        match result {
            Ok((value, duration_ms)) => {
                info!("Flow {} passed in {}ms", file.name, duration_ms);
                FlowRun::passed(file.name.clone(), value, duration_ms)
            }
            Err(FlowError::NoEntry) => {
                warn!("Flow {} skipped: no callable entry point", file.name);
                FlowRun::skipped(file.name.clone(), FlowError::NoEntry.to_string())
            }
            Err(FlowError::Failed(message)) => {
                warn!("Flow {} failed: {}", file.name, message);
                let screenshot = self.capture_failure(page, &file.name).await;
                FlowRun::failed(file.name.clone(), message, screenshot)
            }
        }
    }

    /// Best-effort failure screenshot; returns the POSIX relative path when the file exists
    async fn capture_failure(&self, page: &mut dyn Page, file_name: &str) -> Option<String> {
        let dir = &self.config.screenshots_dir;
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(
                "Failed to create screenshots directory {}: {}",
                dir.display(),
                e
            );
            return None;
        }

        let name = format!("{}-{}.png", file_name, screenshot_timestamp(Utc::now()));
        let path = dir.join(&name);
        if let Err(e) = page.screenshot(&path, true).await {
            warn!("Failed to capture screenshot: {}", e);
        }

        match tokio::fs::try_exists(&path).await {
            Ok(true) => {
                let base = dir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "screenshots".to_string());
                Some(format!("{}/{}", base, name))
            }
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl crate::orchestrator::FlowExecutor for FlowRunner {
    async fn run_flows(&self, url: &str) -> anyhow::Result<FlowBundle> {
        Ok(self.run_for_url(url).await)
    }
}
