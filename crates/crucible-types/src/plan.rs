//! Execution plan types: job descriptors and layered plans.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manifest::Revision;

/// A concrete, scheduled unit of work: one producer instantiated at one
/// tuple of loop indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: String,
    pub producer: String,
    pub inputs: Vec<String>,
    pub produces: Vec<String>,
    pub provider: String,
    pub provider_model: String,
    pub rate_key: String,
    /// The producer model variant's declared output schema, carried
    /// through from the blueprint so a provider handler (in particular
    /// `SimulatedHandler`) can shape its output without the runner
    /// re-deriving it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// A reason recorded against a job explaining why planning marked it dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirtyReason {
    Initial,
    ProducesMissing,
    TouchesDirtyInput,
    TouchesDirtyArtefact,
    InputsHashChanged,
    Propagated,
}

/// Scope controls narrowing or forcing which jobs a plan includes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanScope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_run_from: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up_to_layer: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_artifact_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pinned_artifact_ids: Vec<String>,
}

/// A layered, ready-to-run execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub revision: Revision,
    pub manifest_base_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub layers: Vec<Vec<JobDescriptor>>,
    /// Total number of layers the full (un-scoped) blueprint graph would
    /// produce, recorded for `upToLayer` validation and observability.
    pub blueprint_layer_count: usize,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|l| l.is_empty())
    }

    pub fn job_count(&self) -> usize {
        self.layers.iter().map(|l| l.len()).sum()
    }
}

/// Per-job dirty explanation, keyed by job id, returned alongside a plan
/// when the caller requests reasons.
pub type DirtyExplanation = BTreeMap<String, DirtyReason>;
