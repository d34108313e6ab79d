//! Run Assembler
//!
//! Stamps a run with its id and start time before any work, then wraps the
//! results, verdicts and effective thresholds into the final [`RunRecord`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{RunRecord, UrlResult, Verdict};
use crate::thresholds::Thresholds;

/// Length of a run id in hex characters (48 bits of entropy)
pub const RUN_ID_LEN: usize = 12;

/// Short, URL-safe run identifier
pub fn new_run_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(RUN_ID_LEN);
    id
}

/// A run in progress
#[derive(Debug, Clone)]
pub struct RunAssembler {
    id: String,
    started_at: DateTime<Utc>,
}

impl RunAssembler {
    /// Allocate the id and stamp `startedAt`
    pub fn start() -> Self {
        Self {
            id: new_run_id(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Stamp `finishedAt` and produce the immutable record
    pub fn finish(
        self,
        thresholds: Thresholds,
        results: Vec<UrlResult>,
        verdicts: Vec<Verdict>,
    ) -> RunRecord {
        debug_assert_eq!(results.len(), verdicts.len());
        RunRecord {
            id: self.id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            thresholds,
            results,
            verdicts,
        }
    }
}
