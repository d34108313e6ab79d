//! Browser session contract
//!
//! The flow runner and the page-instrumentation probe drive a browser through
//! these traits. A launcher starts a session; a session opens pages, each in
//! its own browsing context; closing a page releases its context.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::model::PageMetrics;

/// Budget for the initial page load
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Budget for navigations performed inside a flow
pub const DEFAULT_INTRA_FLOW_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser errors
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Browser operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    /// Error raised by page code or a flow script
    #[error("{0}")]
    Script(String),

    #[error("Browser session closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for browser operations
pub type Result<T> = std::result::Result<T, BrowserError>;

/// Readiness criterion for a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

/// How to navigate: readiness criterion and time budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub wait_until: WaitUntil,
    pub timeout: Duration,
}

impl Navigation {
    /// Initial load of the audited URL
    pub fn initial(timeout: Duration) -> Self {
        Self {
            wait_until: WaitUntil::NetworkIdle,
            timeout,
        }
    }

    /// Subsequent navigations inside a flow
    pub fn intra_flow(timeout: Duration) -> Self {
        Self {
            wait_until: WaitUntil::DomContentLoaded,
            timeout,
        }
    }
}

/// Page viewport in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 900,
        }
    }
}

/// What a flow script produced when the browser ran it
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    /// The entry point returned normally
    Returned(Value),
    /// The module exposes no callable entry point
    NoEntry,
}

/// A live browsing context with one page
#[async_trait]
pub trait Page: Send {
    async fn goto(&mut self, url: &str, navigation: Navigation) -> Result<()>;

    /// Capture a screenshot to `path`
    async fn screenshot(&mut self, path: &Path, full_page: bool) -> Result<()>;

    /// Load a flow script and invoke its entry point with this page and `url`
    async fn run_script(&mut self, script: &Path, url: &str) -> Result<ScriptOutcome>;

    /// Collect instrumentation metrics from the loaded document
    async fn metrics(&mut self) -> Result<PageMetrics>;

    /// Close the page and its browsing context
    async fn close(&mut self) -> Result<()>;
}

/// A launched browser
#[async_trait]
pub trait BrowserSession: Send {
    async fn new_page(&mut self, viewport: Viewport) -> Result<Box<dyn Page>>;

    async fn close(&mut self) -> Result<()>;
}

/// Starts browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}
