//! Per-job input resolution (§4.5 step 1-2): reads the *event logs*, never
//! the manifest, since the manifest can be stale mid-execution.

use std::collections::BTreeMap;

use crucible_store::MovieStore;
use crucible_types::{ArtifactId, InputId, ResolvedInput, ResolvedValue};

use crate::error::{RunnerError, RunnerResult};

/// Everything `produce` needs about a job's resolved inputs, plus the
/// deterministic digest fed into its artifact events' `inputsHash`.
pub struct ResolvedJobInputs {
    pub inputs: Vec<ResolvedInput>,
    pub inputs_hash: String,
    /// `artifactId -> relative blob path`, built from the latest artifact
    /// events, for `context.extras.assetBlobPaths`.
    pub asset_blob_paths: BTreeMap<String, String>,
}

pub fn resolve_job_inputs(
    job_id: &str,
    declared_inputs: &[String],
    store: &dyn MovieStore,
) -> RunnerResult<ResolvedJobInputs> {
    let input_events = store.read_input_events()?;
    let latest_inputs: BTreeMap<&str, &crucible_types::InputEvent> =
        input_events.iter().map(|e| (e.id.as_str(), e)).collect();

    let artefact_events = store.read_artefact_events()?;
    let latest_artefacts: BTreeMap<&str, &crucible_types::ArtefactEvent> = artefact_events
        .iter()
        .map(|e| (e.artefact_id.as_str(), e))
        .collect();

    let mut inputs = Vec::with_capacity(declared_inputs.len());
    let mut hashes = Vec::with_capacity(declared_inputs.len());
    let mut asset_blob_paths = BTreeMap::new();

    for id in declared_inputs {
        if InputId::parse(id.clone()).is_ok() {
            let resolved = latest_inputs.get(id.as_str()).map(|event| {
                let value = match &event.payload {
                    crucible_types::InputPayload::Value(v) => ResolvedValue::Json(v.clone()),
                    crucible_types::InputPayload::Blob(b) => ResolvedValue::Blob(b.clone()),
                };
                (value, event.hash.clone())
            });
            let (value, hash) = resolved.unwrap_or((ResolvedValue::Json(serde_json::Value::Null), String::new()));
            hashes.push(hash);
            inputs.push(ResolvedInput { id: id.clone(), value });
        } else if ArtifactId::parse(id.clone()).is_ok() {
            let resolved = latest_artefacts.get(id.as_str());
            let (value, hash) = match resolved {
                Some(event) if event.is_succeeded() => {
                    if let Some(blob) = &event.output {
                        asset_blob_paths.insert(id.clone(), blob.relative_path());
                        (ResolvedValue::Blob(blob.clone()), blob.hash.clone())
                    } else {
                        (ResolvedValue::Json(serde_json::Value::Null), String::new())
                    }
                }
                _ => (ResolvedValue::Json(serde_json::Value::Null), String::new()),
            };
            hashes.push(hash);
            inputs.push(ResolvedInput { id: id.clone(), value });
        } else {
            return Err(RunnerError::InvalidInputId {
                job_id: job_id.to_string(),
                input_id: id.clone(),
            });
        }
    }

    let inputs_hash = crucible_types::canon::digest_of_hashes(hashes.iter().map(|h| h.as_str()));

    Ok(ResolvedJobInputs {
        inputs,
        inputs_hash,
        asset_blob_paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_store::InMemoryMovieStore;
    use crucible_types::{EditedBy, InputEvent, InputPayload};

    #[test]
    fn resolves_input_from_latest_event() {
        let store = InMemoryMovieStore::new("m1");
        store
            .append_input_event(&InputEvent {
                id: InputId::from_name("Theme").unwrap(),
                revision: 0,
                hash: "h0".into(),
                payload: InputPayload::Value(serde_json::json!("sunset")),
                edited_by: EditedBy::User,
                created_at: chrono::Utc::now(),
            })
            .unwrap();

        let resolved = resolve_job_inputs("job", &["Input:Theme".to_string()], &store).unwrap();
        assert_eq!(resolved.inputs.len(), 1);
        assert!(!resolved.inputs_hash.is_empty());
    }

    #[test]
    fn missing_input_resolves_to_empty_hash_not_an_error() {
        let store = InMemoryMovieStore::new("m1");
        let resolved = resolve_job_inputs("job", &["Input:Missing".to_string()], &store).unwrap();
        assert_eq!(resolved.inputs.len(), 1);
    }

    #[test]
    fn rejects_declared_input_with_invalid_id() {
        let store = InMemoryMovieStore::new("m1");
        let err = resolve_job_inputs("job", &["Garbage".to_string()], &store).unwrap_err();
        assert!(matches!(err, RunnerError::InvalidInputId { .. }));
    }
}
