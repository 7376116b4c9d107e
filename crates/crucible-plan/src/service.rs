//! `generatePlan`: the planning service's single entry point, wiring
//! input resolution, blueprint expansion, dirty-set computation, scope
//! controls, and layering into one `ExecutionPlan`.

use chrono::Utc;
use crucible_blueprint::ProducerGraph;
use crucible_store::MovieStore;
use crucible_types::blueprint::BlueprintDocument;
use crucible_types::{DirtyExplanation, ExecutionPlan, InputEvent, InputValues, Manifest, PlanScope, Revision};

use crate::dirty::{self, ArtefactEventsById};
use crate::error::PlanResult;
use crate::layering;
use crate::resolve::{self, ResolvedInputs};

/// Everything `generatePlan` hands back to the caller.
pub struct GeneratedPlan {
    pub plan: ExecutionPlan,
    pub manifest: Manifest,
    pub input_events: Vec<InputEvent>,
    pub resolved_inputs: InputValues,
    pub dirty_explanation: DirtyExplanation,
    pub manifest_hash: Option<String>,
}

pub fn generate_plan(
    blueprint_root: &BlueprintDocument,
    raw_inputs: &InputValues,
    store: &dyn MovieStore,
    scope: &PlanScope,
) -> PlanResult<GeneratedPlan> {
    let manifest = match store.load_current_manifest() {
        Ok(m) => m,
        Err(crucible_store::StoreError::NoCurrentManifest { .. }) => Manifest::empty(Revision(0)),
        Err(other) => return Err(other.into()),
    };
    let manifest_hash = store.load_current()?.map(|c| c.hash);

    let target_revision = manifest.revision.next();

    let write_blob = |bytes: &[u8], mime: &str| -> PlanResult<crucible_types::BlobRef> {
        Ok(store.blobs().put(bytes, mime)?)
    };
    let ResolvedInputs {
        values: resolved_values,
        content_hashes,
        new_events,
    } = resolve::resolve_inputs(
        raw_inputs,
        &blueprint_root.inputs,
        &manifest,
        target_revision.0,
        &write_blob,
    )?;

    for event in &new_events {
        store.append_input_event(event)?;
    }

    let ProducerGraph { jobs: graph } = crucible_blueprint::expand(blueprint_root, &resolved_values)?;

    let artefact_events = store.read_artefact_events()?;
    let events_by_id: ArtefactEventsById<'_> = dirty::compact_artefact_events(&artefact_events);
    let blob_exists = |hash: &str| store.blobs().exists(hash).unwrap_or(false);

    let explanation = dirty::compute_dirty(&graph, &manifest, &events_by_id, &content_hashes, &blob_exists);

    let full_layers = layering::assign_layers(&graph);
    let blueprint_layer_count = full_layers.values().copied().max().map_or(0, |m| m + 1);

    let explanation = crate::scope::apply_scope(explanation, &graph, &manifest, &events_by_id, &full_layers, scope)?;

    let dirty_ids: std::collections::BTreeSet<&str> = explanation.keys().map(|s| s.as_str()).collect();
    let final_jobs: Vec<_> = graph
        .into_iter()
        .filter(|j| dirty_ids.contains(j.job_id.as_str()))
        .collect();

    let layer_of_final = layering::assign_layers(&final_jobs);
    let layers = layering::group_by_layer(final_jobs, &layer_of_final);

    let plan = ExecutionPlan {
        revision: target_revision,
        manifest_base_hash: manifest_hash.clone(),
        created_at: Utc::now(),
        layers,
        blueprint_layer_count,
    };

    Ok(GeneratedPlan {
        plan,
        manifest,
        input_events: new_events,
        resolved_inputs: resolved_values,
        dirty_explanation: explanation,
        manifest_hash,
    })
}
