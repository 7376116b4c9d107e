//! Dirty-set computation: which jobs must re-run given the current
//! manifest, event logs, and resolved input values.

use std::collections::{BTreeMap, BTreeSet};

use crucible_types::canon::digest_of_hashes;
use crucible_types::{ArtefactEvent, DirtyExplanation, DirtyReason, JobDescriptor, Manifest};

/// Per-artifact-id latest event, compacted from the artifact event log.
pub type ArtefactEventsById<'a> = BTreeMap<&'a str, &'a ArtefactEvent>;

pub fn compact_artefact_events(events: &[ArtefactEvent]) -> ArtefactEventsById<'_> {
    let mut out = BTreeMap::new();
    for event in events {
        out.insert(event.artefact_id.as_str(), event);
    }
    out
}

/// Resolves the current content hash of one job input: an `Input:` id
/// looks up `resolved_input_hashes`; an `Artifact:` id looks up the latest
/// event's output blob hash (or `None` if missing/not succeeded).
fn resolve_hash<'a>(
    id: &str,
    resolved_input_hashes: &BTreeMap<String, String>,
    artefact_events: &ArtefactEventsById<'a>,
) -> Option<String> {
    if let Some(h) = resolved_input_hashes.get(id) {
        return Some(h.clone());
    }
    artefact_events
        .get(id)
        .and_then(|e| e.output.as_ref())
        .map(|blob| blob.hash.clone())
}

fn recompute_inputs_hash(
    job: &JobDescriptor,
    resolved_input_hashes: &BTreeMap<String, String>,
    artefact_events: &ArtefactEventsById<'_>,
) -> String {
    let hashes: Vec<String> = job
        .inputs
        .iter()
        .map(|id| resolve_hash(id, resolved_input_hashes, artefact_events).unwrap_or_default())
        .collect();
    digest_of_hashes(hashes.iter().map(|s| s.as_str()))
}

fn artifact_is_dirty(
    artifact_id: &str,
    manifest: &Manifest,
    artefact_events: &ArtefactEventsById<'_>,
    job: &JobDescriptor,
    resolved_input_hashes: &BTreeMap<String, String>,
    blob_exists: &dyn Fn(&str) -> bool,
) -> bool {
    let Some(event) = artefact_events.get(artifact_id) else {
        return true; // no recorded event at all
    };
    if !event.is_succeeded() {
        return true;
    }
    let Some(output) = &event.output else {
        return true;
    };
    if !blob_exists(&output.hash) {
        return true;
    }
    let recomputed = recompute_inputs_hash(job, resolved_input_hashes, artefact_events);
    if event.inputs_hash != recomputed {
        return true;
    }
    !manifest.artefacts.contains_key(artifact_id)
}

/// Computes the dirty-job explanation over the full producer graph.
pub fn compute_dirty(
    graph: &[JobDescriptor],
    manifest: &Manifest,
    artefact_events: &ArtefactEventsById<'_>,
    resolved_input_hashes: &BTreeMap<String, String>,
    blob_exists: &dyn Fn(&str) -> bool,
) -> DirtyExplanation {
    let mut explanation = DirtyExplanation::new();

    let initial_run = manifest.inputs.is_empty() && manifest.artefacts.is_empty();

    for job in graph {
        if initial_run {
            explanation.insert(job.job_id.clone(), DirtyReason::Initial);
            continue;
        }

        let touches_dirty_input = job.inputs.iter().any(|id| {
            id.starts_with("Input:")
                && match manifest.inputs.get(id) {
                    None => true,
                    Some(entry) => resolved_input_hashes
                        .get(id)
                        .is_none_or(|h| *h != entry.hash),
                }
        });
        if touches_dirty_input {
            explanation.insert(job.job_id.clone(), DirtyReason::TouchesDirtyInput);
            continue;
        }

        let produces_missing = job
            .produces
            .iter()
            .any(|a| !manifest.artefacts.contains_key(a));
        if produces_missing {
            explanation.insert(job.job_id.clone(), DirtyReason::ProducesMissing);
            continue;
        }

        let recomputed = recompute_inputs_hash(job, resolved_input_hashes, artefact_events);
        let hash_changed = job.produces.iter().any(|a| {
            artefact_events
                .get(a.as_str())
                .is_none_or(|e| e.inputs_hash != recomputed)
        });
        if hash_changed {
            explanation.insert(job.job_id.clone(), DirtyReason::InputsHashChanged);
            continue;
        }

        let touches_dirty_artefact = job.produces.iter().any(|a| {
            artifact_is_dirty(
                a,
                manifest,
                artefact_events,
                job,
                resolved_input_hashes,
                blob_exists,
            )
        });
        if touches_dirty_artefact {
            explanation.insert(job.job_id.clone(), DirtyReason::TouchesDirtyArtefact);
        }
    }

    propagate(graph, &mut explanation);
    explanation
}

/// Fixed-point propagation: any job depending (through its inputs) on an
/// artifact produced by an already-dirty job becomes dirty too.
fn propagate(graph: &[JobDescriptor], explanation: &mut DirtyExplanation) {
    let producer_of: BTreeMap<&str, &str> = graph
        .iter()
        .flat_map(|j| j.produces.iter().map(move |a| (a.as_str(), j.job_id.as_str())))
        .collect();

    loop {
        let dirty_producers: BTreeSet<&str> = explanation.keys().map(|s| s.as_str()).collect();
        let mut changed = false;
        for job in graph {
            if explanation.contains_key(&job.job_id) {
                continue;
            }
            let depends_on_dirty = job.inputs.iter().any(|id| {
                producer_of
                    .get(id.as_str())
                    .is_some_and(|p| dirty_producers.contains(p))
            });
            if depends_on_dirty {
                explanation.insert(job.job_id.clone(), DirtyReason::Propagated);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}
