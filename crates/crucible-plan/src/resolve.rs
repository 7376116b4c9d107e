//! Input normalization: blob extraction, derived system inputs, and
//! `InputEvent` generation for values that changed since the last run.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use crucible_types::blueprint::InputDecl;
use crucible_types::{EditedBy, InputId, InputPayload, InputValues, Manifest};
use serde_json::Value;

use crate::error::PlanResult;

/// Result of normalizing raw user input against a blueprint's declared
/// inputs: the fully-resolved values (including derived ones), the content
/// hash of every resolved input keyed by canonical id, and the `InputEvent`s
/// that must be appended because their value changed since the manifest.
pub struct ResolvedInputs {
    pub values: InputValues,
    pub content_hashes: BTreeMap<String, String>,
    pub new_events: Vec<crucible_types::InputEvent>,
}

/// Resolves `raw` against `declared`, applying defaults, blob extraction,
/// and the `SegmentDuration = Duration / NumOfSegments` derivation.
///
/// `write_blob` persists blob bytes under their content hash and returns
/// the resulting `BlobRef` — callers pass a closure bound to their store so
/// this module stays storage-agnostic.
pub fn resolve_inputs(
    raw: &InputValues,
    declared: &[InputDecl],
    manifest: &Manifest,
    revision: u64,
    write_blob: &dyn Fn(&[u8], &str) -> PlanResult<crucible_types::BlobRef>,
) -> PlanResult<ResolvedInputs> {
    let mut values = InputValues::default();
    let mut content_hashes = BTreeMap::new();
    let mut new_events = Vec::new();

    for decl in declared {
        let value = match raw.get(&decl.name).cloned().or_else(|| decl.default.clone()) {
            Some(v) => v,
            None => {
                if decl.required {
                    tracing::warn!(input = %decl.name, "required input has no value and no default");
                }
                continue;
            }
        };

        let payload = to_payload(&decl.name, value.clone(), write_blob)?;
        let canonical_id = InputId::from_name(&decl.name)
            .map_err(|e| crate::error::PlanError::NonCanonicalInputId(e.to_string()))?;
        let hash = payload.content_hash();

        record_resolved(
            &mut values,
            &mut content_hashes,
            &mut new_events,
            manifest,
            revision,
            &decl.name,
            canonical_id.as_str(),
            value,
            payload,
            hash,
        );
    }

    derive_segment_duration(&mut values, &mut content_hashes, &mut new_events, manifest, revision);

    Ok(ResolvedInputs {
        values,
        content_hashes,
        new_events,
    })
}

fn to_payload(
    name: &str,
    value: Value,
    write_blob: &dyn Fn(&[u8], &str) -> PlanResult<crucible_types::BlobRef>,
) -> PlanResult<InputPayload> {
    if let Value::Object(map) = &value {
        if let (Some(Value::String(b64)), Some(Value::String(mime))) =
            (map.get("bytesBase64"), map.get("mime"))
        {
            let bytes = BASE64.decode(b64).map_err(|reason| crate::error::PlanError::InvalidBlobPayload {
                input: name.to_string(),
                reason: reason.to_string(),
            })?;
            let blob = write_blob(&bytes, mime)?;
            return Ok(InputPayload::Blob(blob));
        }
    }
    Ok(InputPayload::Value(value))
}

#[allow(clippy::too_many_arguments)]
fn record_resolved(
    values: &mut InputValues,
    content_hashes: &mut BTreeMap<String, String>,
    new_events: &mut Vec<crucible_types::InputEvent>,
    manifest: &Manifest,
    revision: u64,
    bare_name: &str,
    canonical_id: &str,
    raw_value: Value,
    payload: InputPayload,
    hash: String,
) {
    values.insert(bare_name, raw_value);
    content_hashes.insert(canonical_id.to_string(), hash.clone());

    let changed = manifest
        .inputs
        .get(canonical_id)
        .is_none_or(|entry| entry.hash != hash);
    if changed {
        new_events.push(crucible_types::InputEvent {
            id: InputId::from_name(bare_name).expect("already validated"),
            revision,
            hash,
            payload,
            edited_by: EditedBy::User,
            created_at: Utc::now(),
        });
    }
}

fn derive_segment_duration(
    values: &mut InputValues,
    content_hashes: &mut BTreeMap<String, String>,
    new_events: &mut Vec<crucible_types::InputEvent>,
    manifest: &Manifest,
    revision: u64,
) {
    if values.get("SegmentDuration").is_some() {
        return;
    }
    let (Some(duration), Some(num_segments)) = (values.get("Duration"), values.get("NumOfSegments"))
    else {
        return;
    };
    let (Some(duration), Some(num_segments)) = (duration.as_f64(), num_segments.as_u64()) else {
        return;
    };
    if num_segments == 0 {
        return; // NumOfSegments == 0 means "do not derive", not an error.
    }

    let segment_duration = duration / num_segments as f64;
    let value = serde_json::json!(segment_duration);
    let hash = crucible_types::canon::canonical_hash(&value);
    let canonical_id = "Input:SegmentDuration".to_string();

    values.insert("SegmentDuration", value.clone());
    content_hashes.insert(canonical_id.clone(), hash.clone());

    let changed = manifest
        .inputs
        .get(&canonical_id)
        .is_none_or(|entry| entry.hash != hash);
    if changed {
        new_events.push(crucible_types::InputEvent {
            id: InputId::from_name("SegmentDuration").unwrap(),
            revision,
            hash,
            payload: InputPayload::Value(value),
            edited_by: EditedBy::System,
            created_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_types::Revision;

    fn declared(name: &str, required: bool) -> InputDecl {
        InputDecl {
            name: name.to_string(),
            default: None,
            required,
        }
    }

    fn no_blobs(_bytes: &[u8], _mime: &str) -> PlanResult<crucible_types::BlobRef> {
        unreachable!("no blob inputs in this test")
    }

    #[test]
    fn resolves_simple_scalar_input() {
        let mut raw = InputValues::default();
        raw.insert("Theme", serde_json::json!("sunset"));
        let manifest = Manifest::empty(Revision(0));
        let resolved = resolve_inputs(&raw, &[declared("Theme", true)], &manifest, 1, &no_blobs).unwrap();
        assert_eq!(resolved.values.get("Theme").unwrap(), &serde_json::json!("sunset"));
        assert_eq!(resolved.new_events.len(), 1);
    }

    #[test]
    fn blob_input_is_decoded_and_written_through_write_blob() {
        let mut raw = InputValues::default();
        let encoded = BASE64.encode(b"hello world");
        raw.insert(
            "Reference",
            serde_json::json!({"bytesBase64": encoded, "mime": "image/png"}),
        );
        let manifest = Manifest::empty(Revision(0));
        let write_blob = |bytes: &[u8], mime: &str| -> PlanResult<crucible_types::BlobRef> {
            assert_eq!(bytes, b"hello world");
            Ok(crucible_types::BlobRef::new("deadbeef", bytes.len() as u64, mime))
        };
        let resolved = resolve_inputs(&raw, &[declared("Reference", true)], &manifest, 1, &write_blob).unwrap();
        assert_eq!(resolved.new_events.len(), 1);
        assert_eq!(resolved.content_hashes.get("Input:Reference").unwrap(), "deadbeef");
    }

    #[test]
    fn invalid_base64_blob_payload_is_rejected() {
        let mut raw = InputValues::default();
        raw.insert(
            "Reference",
            serde_json::json!({"bytesBase64": "not-valid-base64!!", "mime": "image/png"}),
        );
        let manifest = Manifest::empty(Revision(0));
        let err = resolve_inputs(&raw, &[declared("Reference", true)], &manifest, 1, &no_blobs).unwrap_err();
        assert!(matches!(err, crate::error::PlanError::InvalidBlobPayload { .. }));
    }

    #[test]
    fn unchanged_value_produces_no_new_event() {
        let mut raw = InputValues::default();
        raw.insert("Theme", serde_json::json!("sunset"));
        let hash = crucible_types::canon::canonical_hash(&serde_json::json!("sunset"));
        let mut manifest = Manifest::empty(Revision(0));
        manifest.inputs.insert(
            "Input:Theme".into(),
            crucible_types::ManifestInputEntry {
                hash,
                payload_digest: "x".into(),
                created_at: Utc::now(),
            },
        );
        let resolved = resolve_inputs(&raw, &[declared("Theme", true)], &manifest, 1, &no_blobs).unwrap();
        assert!(resolved.new_events.is_empty());
    }

    #[test]
    fn derives_segment_duration_when_absent() {
        let mut raw = InputValues::default();
        raw.insert("Duration", serde_json::json!(30.0));
        raw.insert("NumOfSegments", serde_json::json!(3));
        let manifest = Manifest::empty(Revision(0));
        let resolved = resolve_inputs(
            &raw,
            &[declared("Duration", true), declared("NumOfSegments", true)],
            &manifest,
            1,
            &no_blobs,
        )
        .unwrap();
        assert_eq!(
            resolved.values.get("SegmentDuration").unwrap(),
            &serde_json::json!(10.0)
        );
    }

    #[test]
    fn zero_segments_does_not_derive_or_error() {
        let mut raw = InputValues::default();
        raw.insert("Duration", serde_json::json!(30.0));
        raw.insert("NumOfSegments", serde_json::json!(0));
        let manifest = Manifest::empty(Revision(0));
        let resolved = resolve_inputs(
            &raw,
            &[declared("Duration", true), declared("NumOfSegments", true)],
            &manifest,
            1,
            &no_blobs,
        )
        .unwrap();
        assert!(resolved.values.get("SegmentDuration").is_none());
    }
}
