//! Simulated-mode handler: fabricates plausible output from a producer's
//! declared `output_schema` without any external call, so that planning,
//! layering, and store-integrity paths can be exercised end-to-end (§4.7).

use crucible_types::{
    ArtifactBlobData, ArtifactResult, ArtifactStatus, HandlerMode, JobDescriptor, ProduceRequest,
    ProduceResponse,
};
use serde_json::Value;

use crate::error::ProviderResult;
use crate::handler::ProducerHandler;

/// Generates deterministic, schema-shaped JSON for every artifact a job
/// declares, with no provider call and no randomness.
pub struct SimulatedHandler;

impl ProducerHandler for SimulatedHandler {
    fn mode(&self) -> HandlerMode {
        HandlerMode::Simulated
    }

    fn warm_start(&self, _descriptors: &[JobDescriptor]) -> ProviderResult<()> {
        Ok(())
    }

    fn invoke(&self, request: ProduceRequest) -> ProviderResult<ProduceResponse> {
        let schema = request.output_schema.clone().unwrap_or(Value::Null);
        let artefacts = request
            .produces
            .iter()
            .map(|artifact_id| {
                let value = generate_from_schema(&schema, artifact_bare_name(artifact_id));
                let bytes = serde_json::to_vec(&value).unwrap_or_default();
                ArtifactResult {
                    artifact_id: artifact_id.clone(),
                    status: Some(ArtifactStatus::Succeeded),
                    blob: Some(ArtifactBlobData {
                        data: bytes,
                        mime_type: "application/json".to_string(),
                    }),
                    diagnostics: None,
                }
            })
            .collect();

        Ok(ProduceResponse {
            job_id: request.job_id,
            status: Some(ArtifactStatus::Succeeded),
            artefacts,
            diagnostics: None,
        })
    }
}

/// The trailing dotted segment of a canonical artifact id, e.g. `Out` from
/// `Artifact:Scene[0].Out` — used to look up a matching schema property.
fn artifact_bare_name(artifact_id: &str) -> &str {
    artifact_id
        .rsplit('.')
        .next()
        .unwrap_or(artifact_id)
        .split('[')
        .next()
        .unwrap_or(artifact_id)
}

/// Produces a plausible JSON value for `schema`. Looks up `field_name` in
/// the schema's `properties` first, since one producer's `output_schema`
/// commonly describes every artifact the producer emits as sibling
/// properties; falls back to generating from the whole schema.
fn generate_from_schema(schema: &Value, field_name: &str) -> Value {
    if let Some(field_schema) = schema.get("properties").and_then(|p| p.get(field_name)) {
        return generate_value(field_schema);
    }
    generate_value(schema)
}

fn generate_value(schema: &Value) -> Value {
    if let Some(example) = schema.get("example") {
        return example.clone();
    }
    if let Some(default) = schema.get("default") {
        return default.clone();
    }
    if let Some(variants) = schema.get("enum").and_then(Value::as_array) {
        if let Some(first) = variants.first() {
            return first.clone();
        }
    }

    match schema.get("type").and_then(Value::as_str) {
        Some("object") => {
            let mut obj = serde_json::Map::new();
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (key, prop_schema) in properties {
                    obj.insert(key.clone(), generate_value(prop_schema));
                }
            }
            Value::Object(obj)
        }
        Some("array") => {
            let min_items = schema
                .get("minItems")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .max(1) as usize;
            let item_schema = schema.get("items").cloned().unwrap_or(Value::Null);
            Value::Array((0..min_items).map(|_| generate_value(&item_schema)).collect())
        }
        Some("string") => Value::String("simulated".to_string()),
        Some("integer") => Value::from(0),
        Some("number") => Value::from(0.0),
        Some("boolean") => Value::Bool(false),
        Some("null") | None => Value::Null,
        Some(_) => Value::Null,
    }
}
