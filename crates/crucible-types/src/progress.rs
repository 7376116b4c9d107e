//! Progress event payloads multicast over the progress bus while a plan
//! executes. Best-effort, fire-and-forget — never load-bearing state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::ArtifactStatus;

/// One event emitted during plan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    LayerStart {
        layer: usize,
        job_count: usize,
        at: DateTime<Utc>,
    },
    LayerEmpty {
        layer: usize,
        at: DateTime<Utc>,
    },
    LayerSkipped {
        layer: usize,
        reason: String,
        at: DateTime<Utc>,
    },
    LayerComplete {
        layer: usize,
        succeeded: usize,
        failed: usize,
        at: DateTime<Utc>,
    },
    JobStarted {
        job_id: String,
        layer: usize,
        at: DateTime<Utc>,
    },
    JobStatus {
        job_id: String,
        layer: usize,
        status: ArtifactStatus,
        at: DateTime<Utc>,
    },
    JobError {
        job_id: String,
        layer: usize,
        message: String,
        recoverable: bool,
        at: DateTime<Utc>,
    },
    /// A job was never dispatched to a provider because one of its inputs
    /// references an artifact that failed earlier in this same run.
    JobBlocked {
        job_id: String,
        layer: usize,
        upstream_artifact_id: String,
        at: DateTime<Utc>,
    },
    ExecutionComplete {
        total_jobs: usize,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        at: DateTime<Utc>,
    },
    Cancelled {
        at_layer: usize,
        at: DateTime<Utc>,
    },
}
