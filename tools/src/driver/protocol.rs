//! Driver Protocol Implementation
//!
//! Newline-delimited JSON over the driver's stdin/stdout. Each request is a
//! single line `{"id": n, "op": "..", ..params}`; the driver answers each one
//! with `{"id": n, "ok": true, "result": ..}` or
//! `{"id": n, "ok": false, "error": ".."}`. Replies carrying an id other than
//! the one awaited (late answers to timed-out requests) are discarded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tracing::{debug, trace, warn};

use webaudit_core::browser::{BrowserError, Result};

/// A request line
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub id: u64,
    pub op: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

/// A reply line
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reply {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Reply {
    /// The result on success, the driver's error message otherwise
    pub fn into_outcome(self) -> std::result::Result<Value, String> {
        if self.ok {
            Ok(self.result.unwrap_or(Value::Null))
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "driver reported an unspecified error".to_string()))
        }
    }
}

/// Parse one reply line
pub fn parse_reply(line: &str) -> Result<Reply> {
    serde_json::from_str(line.trim())
        .map_err(|e| BrowserError::Protocol(format!("malformed reply {:?}: {}", line.trim(), e)))
}

/// Build the params map from a JSON object literal
pub fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// A live driver process and its pipes
pub struct DriverConnection {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    closed: bool,
}

impl DriverConnection {
    pub fn new(mut child: Child) -> Result<Self> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BrowserError::Launch("driver stdin is not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrowserError::Launch("driver stdout is not piped".to_string()))?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            closed: false,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Send `op` and wait up to `timeout` for its reply
    ///
    /// The outer error is a transport failure; the inner one is the error
    /// message the driver reported for this operation.
    pub async fn request(
        &mut self,
        op: &str,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<std::result::Result<Value, String>> {
        if self.closed {
            return Err(BrowserError::Closed);
        }

        let id = self.next_id;
        self.next_id += 1;

        let request = Request {
            id,
            op: op.to_string(),
            params,
        };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        trace!("-> driver: {}", line.trim_end());

        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        match tokio::time::timeout(timeout, self.read_reply(id)).await {
            Ok(reply) => Ok(reply?.into_outcome()),
            Err(_) => Err(BrowserError::Timeout {
                operation: op.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn read_reply(&mut self, id: u64) -> Result<Reply> {
        loop {
            let Some(line) = self.stdout.next_line().await? else {
                self.closed = true;
                return Err(BrowserError::Closed);
            };
            if line.trim().is_empty() {
                continue;
            }
            trace!("<- driver: {}", line);

            match parse_reply(&line) {
                Ok(reply) if reply.id == id => return Ok(reply),
                Ok(reply) => debug!("Discarding stale driver reply {}", reply.id),
                Err(e) => warn!("{}", e),
            }
        }
    }

    /// Ask the driver to exit, killing it if it does not within `timeout`
    pub async fn shutdown(&mut self, timeout: Duration) -> Result<()> {
        if !self.closed {
            let farewell = self.request("close", Map::new(), timeout).await;
            self.closed = true;
            if let Err(e) = farewell {
                debug!("Driver did not acknowledge close: {}", e);
            }
        }

        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!("Driver exited with {}", status);
                Ok(())
            }
            Ok(Err(e)) => Err(BrowserError::Io(e)),
            Err(_) => {
                warn!("Driver did not exit in time, killing it");
                self.child.kill().await?;
                Ok(())
            }
        }
    }
}
