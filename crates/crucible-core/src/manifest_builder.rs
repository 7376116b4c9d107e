//! Manifest Builder (§4.6): compacts both event logs into the latest-state
//! view, independent of any particular run's revision — the manifest
//! reflects the entire history, not just what the current run touched.

use std::collections::BTreeMap;

use chrono::Utc;
use crucible_store::{compact_latest_wins, MovieStore};
use crucible_types::{
    Manifest, ManifestArtifactEntry, ManifestInputEntry, Revision, RunConfig, Timeline,
};

use crate::error::CoreResult;

/// Compacts the input and artefact event logs into a new manifest for
/// `revision`, built on top of `base_revision` (the manifest this run
/// started from, if any).
pub fn build_manifest(
    store: &dyn MovieStore,
    revision: Revision,
    base_revision: Option<Revision>,
    run_config: RunConfig,
    timeline: Timeline,
) -> CoreResult<Manifest> {
    let input_events = store.read_input_events()?;
    let latest_inputs = compact_latest_wins(input_events, |e| e.id.as_str().to_string());
    let inputs: BTreeMap<String, ManifestInputEntry> = latest_inputs
        .into_iter()
        .map(|(id, event)| {
            (
                id,
                ManifestInputEntry {
                    hash: event.hash.clone(),
                    payload_digest: event.hash,
                    created_at: event.created_at,
                },
            )
        })
        .collect();

    let artefact_events = store.read_artefact_events()?;
    let latest_artefacts = compact_latest_wins(artefact_events, |e| e.artefact_id.as_str().to_string());
    let artefacts: BTreeMap<String, ManifestArtifactEntry> = latest_artefacts
        .into_iter()
        .map(|(id, event)| {
            (
                id,
                ManifestArtifactEntry {
                    hash: event.inputs_hash,
                    blob: event.output,
                    produced_by: event.produced_by,
                    status: event.status,
                    created_at: event.created_at,
                },
            )
        })
        .collect();

    Ok(Manifest {
        revision,
        base_revision,
        created_at: Utc::now(),
        inputs,
        artefacts,
        run_config: Some(run_config),
        timeline: Some(timeline),
    })
}
