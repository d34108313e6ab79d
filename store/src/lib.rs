//! WebAudit Store Module
//!
//! Run history persisted as a single JSON array of run records, newest
//! first. The file and its parent directory are created on first use.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use webaudit_core::model::RunRecord;

/// History store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("History I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("History file {path} is not a valid run list: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// JSON-file run history
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    async fn ensure_exists(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        if !exists {
            debug!("Creating empty history at {}", self.path.display());
            tokio::fs::write(&self.path, "[]")
                .await
                .map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<RunRecord>> {
        self.ensure_exists().await?;
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Json {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Every stored run, newest first
    pub async fn load(&self) -> Result<Vec<RunRecord>> {
        let _guard = self.lock.lock().await;
        self.read_all().await
    }

    /// Prepend `record` and rewrite the history
    pub async fn save(&self, record: &RunRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut runs = self.read_all().await?;
        runs.insert(0, record.clone());

        let body = serde_json::to_string_pretty(&runs).map_err(|source| StoreError::Json {
            path: self.path.display().to_string(),
            source,
        })?;

        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        info!(
            "Saved run {} to {} ({} run(s) in history)",
            record.id,
            self.path.display(),
            runs.len()
        );
        Ok(())
    }

    /// The newest run, if any
    pub async fn latest(&self) -> Result<Option<RunRecord>> {
        Ok(self.load().await?.into_iter().next())
    }
}
