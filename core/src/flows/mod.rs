//! Behavioral flows
//!
//! A flow drives a page to exercise site behaviour: `flow(page, url) -> result`.
//! Flows are discovered as files in a flows directory and resolved through a
//! [`FlowRegistry`]: compiled-in implementations registered under a file name
//! win, every other file is run by the browser as a script.

pub mod discovery;
pub mod registry;
pub mod runner;

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

use crate::browser::{BrowserError, Page, ScriptOutcome};
use crate::model::NO_ENTRY_EXPORTED;

pub use discovery::{discover_flows, is_flow_file, FlowFile, FLOW_SUFFIXES};
pub use registry::FlowRegistry;
pub use runner::{FlowRunner, FlowRunnerConfig};

/// Errors a flow can end with
#[derive(Debug, Error)]
pub enum FlowError {
    /// The flow has no callable entry point; the run is skipped
    #[error("{}", NO_ENTRY_EXPORTED)]
    NoEntry,

    /// The flow threw or asserted
    #[error("{0}")]
    Failed(String),
}

impl From<BrowserError> for FlowError {
    fn from(e: BrowserError) -> Self {
        FlowError::Failed(e.to_string())
    }
}

impl From<anyhow::Error> for FlowError {
    fn from(e: anyhow::Error) -> Self {
        FlowError::Failed(format!("{:#}", e))
    }
}

/// A behavioral flow run against a page already navigated to `url`
///
/// Flows must be self-contained: state left on the page by an earlier flow
/// is not guaranteed to survive.
#[async_trait]
pub trait Flow: Send + Sync {
    async fn run(&self, page: &mut dyn Page, url: &str) -> Result<Value, FlowError>;
}

/// A flow file executed by the browser driver
#[derive(Debug, Clone)]
pub struct ScriptFlow {
    path: PathBuf,
}

impl ScriptFlow {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Flow for ScriptFlow {
    async fn run(&self, page: &mut dyn Page, url: &str) -> Result<Value, FlowError> {
        match page.run_script(&self.path, url).await? {
            ScriptOutcome::Returned(value) => Ok(value),
            ScriptOutcome::NoEntry => Err(FlowError::NoEntry),
        }
    }
}
