//! The engine's control surface (§6): `generatePlan → (confirm) →
//! executePlan → buildManifest → saveManifest → Summary`.

use std::sync::Arc;

use chrono::Utc;
use crucible_blueprint::BlueprintDocument;
use crucible_plan::GeneratedPlan;
use crucible_progress::ProgressBus;
use crucible_provider::HandlerRegistry;
use crucible_runner::{CancellationToken, RunOptions, RunStatus};
use crucible_store::MovieStore;
use crucible_types::{InputValues, Manifest, PlanScope, RunConfig, Timeline};

use crate::error::CoreResult;
use crate::manifest_builder::build_manifest;

/// Everything a caller needs to report on one build: the plan that ran,
/// what happened, and the manifest it produced.
pub struct BuildSummary {
    pub revision: u64,
    pub status: RunStatus,
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub manifest: Manifest,
    pub manifest_hash: String,
}

/// Plans, executes, and compacts one build in a single call. Equivalent to
/// composing [`crucible_plan::generate_plan`], [`crucible_runner::execute_plan`],
/// [`build_manifest`], and `store.save_manifest` by hand — exposed for
/// callers (CLI, API) that want the whole pipeline rather than its stages.
pub fn run_build(
    blueprint_root: &BlueprintDocument,
    raw_inputs: &InputValues,
    store: Arc<dyn MovieStore>,
    handlers: Arc<HandlerRegistry>,
    progress: &ProgressBus,
    cancel: &CancellationToken,
    scope: &PlanScope,
    run_options: &RunOptions,
) -> CoreResult<BuildSummary> {
    let started_at = Utc::now();

    let GeneratedPlan {
        plan,
        manifest: base_manifest,
        manifest_hash: base_manifest_hash,
        ..
    } = crucible_plan::generate_plan(blueprint_root, raw_inputs, store.as_ref(), scope)?;

    store.save_plan(&plan)?;

    let run_result = crucible_runner::execute_plan(&plan, Arc::clone(&store), handlers, progress, cancel, run_options)?;

    let run_config = RunConfig {
        up_to_layer: run_options.up_to_layer,
        re_run_from: scope.re_run_from,
        target_artifact_ids: if scope.target_artifact_ids.is_empty() {
            None
        } else {
            Some(scope.target_artifact_ids.clone())
        },
        dry_run: Some(false),
        concurrency: Some(run_options.concurrency),
    };
    let timeline = Timeline {
        started_at: Some(started_at),
        finished_at: Some(Utc::now()),
    };

    let base_revision = if base_manifest.artefacts.is_empty() && base_manifest.inputs.is_empty() {
        None
    } else {
        Some(base_manifest.revision)
    };

    let manifest = build_manifest(store.as_ref(), plan.revision, base_revision, run_config, timeline)?;
    let manifest_hash = store.save_manifest(&manifest, base_manifest_hash.as_deref())?;

    Ok(BuildSummary {
        revision: plan.revision.0,
        status: run_result.status,
        total_jobs: run_result.total_jobs,
        succeeded: run_result.succeeded,
        failed: run_result.failed,
        skipped: run_result.skipped,
        manifest,
        manifest_hash,
    })
}
