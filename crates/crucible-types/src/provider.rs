//! The provider handler contract: what a runner sends to and receives from
//! a generation backend for one job. A handler is `{mode, warmStart?,
//! invoke}`; `invoke` may produce more than one artifact per call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blob::BlobRef;

/// Whether a handler talks to a real backend or fabricates plausible
/// output from declared schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerMode {
    Live,
    Simulated,
}

/// The concrete value behind a resolved input: inline JSON, or a blob the
/// provider reads by content hash from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedValue {
    Json(Value),
    Blob(BlobRef),
}

/// One resolved input/artifact value handed to a provider for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInput {
    pub id: String,
    pub value: ResolvedValue,
}

/// Planner context threaded through to the provider for loop-aware and
/// namespace-aware handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerContext {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index: Vec<usize>,
    pub namespace_path: String,
    pub producer_alias: String,
}

/// `context.extras`: everything beyond the bare request a handler may need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProduceContextExtras {
    pub resolved_inputs: Vec<ResolvedInput>,
    pub planner_context: PlannerContext,
    /// Built from the *latest* artifact events, never the manifest.
    pub asset_blob_paths: std::collections::BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_mapping: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_outputs: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProduceContext {
    pub job_id: String,
    pub revision: u64,
    pub layer_index: usize,
    pub attempt: u32,
    pub extras: ProduceContextExtras,
}

/// Everything a provider needs to produce every artifact a job owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProduceRequest {
    pub job_id: String,
    pub provider: String,
    pub model: String,
    pub revision: u64,
    pub inputs: Vec<ResolvedInput>,
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    pub context: ProduceContext,
}

/// Structured diagnostics a provider may attach to a response or a single
/// artifact result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderDiagnostics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recoverable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Bytes plus a MIME type for one artifact a provider produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBlobData {
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// One artifact's outcome within a `ProduceResponse`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactResult {
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<crate::events::ArtifactStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<ArtifactBlobData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<ProviderDiagnostics>,
}

/// A provider's verdict on a produce request: one result per requested
/// artifact, plus optional job-level diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProduceResponse {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<crate::events::ArtifactStatus>,
    pub artefacts: Vec<ArtifactResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<ProviderDiagnostics>,
}

/// Key a runner caches warmed-up handlers under: a handler is reusable
/// across jobs that share mode, provider, model, and environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerCacheKey {
    pub mode: String,
    pub provider: String,
    pub model: String,
    pub environment: String,
}

impl HandlerCacheKey {
    pub fn new(
        mode: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            mode: mode.into(),
            provider: provider.into(),
            model: model.into(),
            environment: environment.into(),
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        hex::encode(bytes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
