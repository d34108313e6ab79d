//! Out-of-process browser driver
//!
//! Implements the browser contract by spawning a driver process (by default
//! a Playwright script run by node) and talking to it over
//! [`protocol`]. One driver process backs one browser session; pages are
//! addressed by the `pageId` the driver hands out.

pub mod protocol;

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use webaudit_core::browser::{
    BrowserError, BrowserLauncher, BrowserSession, Navigation, Page, Result, ScriptOutcome,
    Viewport, DEFAULT_INTRA_FLOW_NAVIGATION_TIMEOUT,
};
use webaudit_core::config::DriverSettings;
use webaudit_core::model::PageMetrics;

use protocol::{params, DriverConnection};

/// Budget for driver operations that carry no timeout of their own
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Budget for the driver to acknowledge shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Slack on top of a navigation budget before the driver itself is considered stuck
const NAVIGATION_SLACK: Duration = Duration::from_secs(5);

type SharedConnection = Arc<Mutex<DriverConnection>>;

/// Paths sent to the driver are absolute; it may run in another directory
fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Spawns a driver process per session
#[derive(Debug, Clone)]
pub struct DriverLauncher {
    settings: DriverSettings,
    intra_flow_navigation_timeout: Duration,
    operation_timeout: Duration,
}

impl DriverLauncher {
    pub fn new(settings: DriverSettings) -> Self {
        Self {
            settings,
            intra_flow_navigation_timeout: DEFAULT_INTRA_FLOW_NAVIGATION_TIMEOUT,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Budget for navigations a flow performs itself; they wait for
    /// "DOM content loaded" unless the flow asks otherwise
    pub fn with_intra_flow_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.intra_flow_navigation_timeout = timeout;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

#[async_trait]
impl BrowserLauncher for DriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        debug!(
            "Spawning browser driver: {} {:?}",
            self.settings.command, self.settings.args
        );

        let child = Command::new(&self.settings.command)
            .args(&self.settings.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BrowserError::Launch(format!(
                    "failed to start driver '{}': {}",
                    self.settings.command, e
                ))
            })?;

        let mut connection = DriverConnection::new(child)?;
        let launched = connection
            .request(
                "launch",
                params(json!({ "headless": self.settings.headless })),
                self.operation_timeout,
            )
            .await;

        match launched {
            Ok(Ok(_)) => {}
            Ok(Err(message)) => {
                let _ = connection.shutdown(SHUTDOWN_TIMEOUT).await;
                return Err(BrowserError::Launch(message));
            }
            Err(e) => {
                let _ = connection.shutdown(SHUTDOWN_TIMEOUT).await;
                return Err(BrowserError::Launch(e.to_string()));
            }
        }

        info!("Browser driver launched");
        Ok(Box::new(DriverSession {
            connection: Arc::new(Mutex::new(connection)),
            intra_flow_navigation_timeout: self.intra_flow_navigation_timeout,
            operation_timeout: self.operation_timeout,
        }))
    }
}

/// A browser owned by one driver process
pub struct DriverSession {
    connection: SharedConnection,
    intra_flow_navigation_timeout: Duration,
    operation_timeout: Duration,
}

#[async_trait]
impl BrowserSession for DriverSession {
    async fn new_page(&mut self, viewport: Viewport) -> Result<Box<dyn Page>> {
        let intra_flow = Navigation::intra_flow(self.intra_flow_navigation_timeout);
        let reply = self
            .connection
            .lock()
            .await
            .request(
                "newPage",
                params(json!({
                    "viewport": { "width": viewport.width, "height": viewport.height },
                    "navigationTimeoutMs": intra_flow.timeout.as_millis() as u64,
                    "waitUntil": intra_flow.wait_until,
                })),
                self.operation_timeout,
            )
            .await?
            .map_err(BrowserError::Protocol)?;

        let page_id = reply["pageId"]
            .as_str()
            .ok_or_else(|| BrowserError::Protocol("newPage reply carries no pageId".to_string()))?
            .to_string();

        Ok(Box::new(DriverPage {
            connection: self.connection.clone(),
            page_id,
            operation_timeout: self.operation_timeout,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.connection.lock().await.shutdown(SHUTDOWN_TIMEOUT).await?;
        info!("Browser driver closed");
        Ok(())
    }
}

/// One page (and its browsing context) inside a driver
pub struct DriverPage {
    connection: SharedConnection,
    page_id: String,
    operation_timeout: Duration,
}

impl DriverPage {
    async fn call(
        &self,
        op: &str,
        mut args: serde_json::Map<String, Value>,
        timeout: Duration,
    ) -> Result<std::result::Result<Value, String>> {
        args.insert("pageId".to_string(), Value::String(self.page_id.clone()));
        self.connection.lock().await.request(op, args, timeout).await
    }
}

#[async_trait]
impl Page for DriverPage {
    async fn goto(&mut self, url: &str, navigation: Navigation) -> Result<()> {
        let args = params(json!({
            "url": url,
            "waitUntil": navigation.wait_until,
            "timeoutMs": navigation.timeout.as_millis() as u64,
        }));
        self.call("goto", args, navigation.timeout + NAVIGATION_SLACK)
            .await?
            .map_err(|reason| BrowserError::Navigation {
                url: url.to_string(),
                reason,
            })?;
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> Result<()> {
        let path = absolute(path)?;
        let args = params(json!({
            "path": path.to_string_lossy(),
            "fullPage": full_page,
        }));
        self.call("screenshot", args, self.operation_timeout)
            .await?
            .map_err(BrowserError::Screenshot)?;
        Ok(())
    }

    async fn run_script(&mut self, script: &Path, url: &str) -> Result<ScriptOutcome> {
        let script = absolute(script)?;
        let args = params(json!({
            "script": script.to_string_lossy(),
            "url": url,
        }));
        let reply = self
            .call("runFlow", args, self.operation_timeout)
            .await?
            .map_err(BrowserError::Script)?;

        if reply["noEntry"].as_bool().unwrap_or(false) {
            return Ok(ScriptOutcome::NoEntry);
        }
        Ok(ScriptOutcome::Returned(
            reply.get("value").cloned().unwrap_or(Value::Null),
        ))
    }

    async fn metrics(&mut self) -> Result<PageMetrics> {
        let reply = self
            .call("metrics", serde_json::Map::new(), self.operation_timeout)
            .await?
            .map_err(BrowserError::Script)?;
        Ok(serde_json::from_value(reply)?)
    }

    async fn close(&mut self) -> Result<()> {
        let mut connection = self.connection.lock().await;
        if connection.is_closed() {
            return Ok(());
        }
        let mut args = serde_json::Map::new();
        args.insert("pageId".to_string(), Value::String(self.page_id.clone()));
        connection
            .request("closePage", args, self.operation_timeout)
            .await?
            .map_err(BrowserError::Protocol)?;
        Ok(())
    }
}
