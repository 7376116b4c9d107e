//! Per-job execution (§4.5 steps 3-5): invoke the provider, persist blobs
//! and artifact events, and emit progress — never propagating a provider
//! failure as a `RunnerError`, only as failed artifact events.

use chrono::Utc;
use crucible_progress::ProgressBus;
use crucible_provider::{HandlerRegistry, ProducerHandler};
use crucible_store::MovieStore;
use crucible_types::{
    ArtefactEvent, ArtifactStatus, Diagnostics, HandlerCacheKey, JobDescriptor, PlannerContext,
    ProduceContext, ProduceContextExtras, ProduceRequest, ProgressEvent,
};

use crate::error::RunnerResult;
use crate::resolve::resolve_job_inputs;

/// Outcome of running one job: how many of its declared artifacts
/// succeeded, failed, or were explicitly skipped by the provider, for the
/// layer's summary counters. `blocked_artifact_ids` lists every artifact
/// this job produced that did *not* succeed — the layer runner blocks any
/// later job that depends on one of these within the same run.
pub struct JobOutcome {
    pub job_id: String,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub blocked_artifact_ids: Vec<String>,
}

#[allow(clippy::too_many_arguments)]
pub fn run_job(
    job: &JobDescriptor,
    revision: u64,
    layer_index: usize,
    attempt: u32,
    mode: &str,
    environment: &str,
    handlers: &HandlerRegistry,
    store: &dyn MovieStore,
    progress: &ProgressBus,
) -> RunnerResult<JobOutcome> {
    progress.publish(ProgressEvent::JobStarted {
        job_id: job.job_id.clone(),
        layer: layer_index,
        at: Utc::now(),
    });

    let resolved = resolve_job_inputs(&job.job_id, &job.inputs, store)?;

    let handler_key = HandlerCacheKey::new(mode, job.provider.clone(), job.provider_model.clone(), environment);
    let handler = match handlers.get(&handler_key) {
        Ok(handler) => handler,
        Err(err) => {
            return Ok(fail_all_artifacts(job, revision, &resolved.inputs_hash, &err.to_string(), store, progress, layer_index)?);
        }
    };

    let request = ProduceRequest {
        job_id: job.job_id.clone(),
        provider: job.provider.clone(),
        model: job.provider_model.clone(),
        revision,
        inputs: resolved.inputs.clone(),
        produces: job.produces.clone(),
        output_schema: job.output_schema.clone(),
        context: ProduceContext {
            job_id: job.job_id.clone(),
            revision,
            layer_index,
            attempt,
            extras: ProduceContextExtras {
                resolved_inputs: resolved.inputs.clone(),
                planner_context: PlannerContext {
                    index: Vec::new(),
                    namespace_path: job.producer.clone(),
                    producer_alias: job.producer.clone(),
                },
                asset_blob_paths: resolved.asset_blob_paths.clone(),
                sdk_mapping: None,
                declared_outputs: None,
            },
        },
    };

    tracing::info!(job_id = %job.job_id, layer = layer_index, attempt, "invoking provider");

    let response = match handler.invoke(request) {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(job_id = %job.job_id, error = %err, "provider invocation failed");
            progress.publish(ProgressEvent::JobError {
                job_id: job.job_id.clone(),
                layer: layer_index,
                message: err.to_string(),
                recoverable: false,
                at: Utc::now(),
            });
            return fail_all_artifacts(job, revision, &resolved.inputs_hash, &err.to_string(), store, progress, layer_index);
        }
    };

    let mut succeeded = 0;
    let mut failed = 0;
    let mut skipped = 0;
    let mut blocked_artifact_ids = Vec::new();
    let returned: std::collections::BTreeMap<&str, &crucible_types::ArtifactResult> =
        response.artefacts.iter().map(|a| (a.artifact_id.as_str(), a)).collect();

    for artefact_id in &job.produces {
        let (status, output, diagnostics) = match returned.get(artefact_id.as_str()) {
            Some(result) => {
                let status = result.status.unwrap_or(ArtifactStatus::Succeeded);
                let output = match &result.blob {
                    Some(blob) => Some(store.blobs().put(&blob.data, &blob.mime_type)?),
                    None => None,
                };
                let diagnostics = result.diagnostics.as_ref().map(|d| Diagnostics {
                    provider_request_id: d.provider_request_id.clone(),
                    recoverable: d.recoverable,
                    message: d.message.clone(),
                });
                (status, output, diagnostics)
            }
            None => (
                ArtifactStatus::Failed,
                None,
                Some(Diagnostics {
                    provider_request_id: None,
                    recoverable: Some(false),
                    message: Some("provider response omitted this artifact".to_string()),
                }),
            ),
        };

        match status {
            ArtifactStatus::Succeeded => succeeded += 1,
            ArtifactStatus::Skipped => skipped += 1,
            ArtifactStatus::Failed => {
                failed += 1;
                blocked_artifact_ids.push(artefact_id.clone());
            }
        }

        let artifact_id_parsed = crucible_types::ArtifactId::parse(artefact_id.clone())
            .expect("job descriptors carry canonical artifact ids");
        store.append_artefact_event(&ArtefactEvent {
            artefact_id: artifact_id_parsed,
            revision,
            inputs_hash: resolved.inputs_hash.clone(),
            output,
            status,
            produced_by: job.job_id.clone(),
            diagnostics,
            created_at: Utc::now(),
        })?;
    }

    progress.publish(ProgressEvent::JobStatus {
        job_id: job.job_id.clone(),
        layer: layer_index,
        status: if failed == 0 { ArtifactStatus::Succeeded } else { ArtifactStatus::Failed },
        at: Utc::now(),
    });

    Ok(JobOutcome {
        job_id: job.job_id.clone(),
        succeeded,
        failed,
        skipped,
        blocked_artifact_ids,
    })
}

/// §4.5 step 5: on a thrown provider error, or an unresolvable handler,
/// every artifact the job was expected to produce gets a failed event.
fn fail_all_artifacts(
    job: &JobDescriptor,
    revision: u64,
    inputs_hash: &str,
    message: &str,
    store: &dyn MovieStore,
    progress: &ProgressBus,
    layer_index: usize,
) -> RunnerResult<JobOutcome> {
    for artefact_id in &job.produces {
        let artifact_id_parsed = crucible_types::ArtifactId::parse(artefact_id.clone())
            .expect("job descriptors carry canonical artifact ids");
        store.append_artefact_event(&ArtefactEvent {
            artefact_id: artifact_id_parsed,
            revision,
            inputs_hash: inputs_hash.to_string(),
            output: None,
            status: ArtifactStatus::Failed,
            produced_by: job.job_id.clone(),
            diagnostics: Some(Diagnostics {
                provider_request_id: None,
                recoverable: Some(false),
                message: Some(message.to_string()),
            }),
            created_at: Utc::now(),
        })?;
    }
    progress.publish(ProgressEvent::JobStatus {
        job_id: job.job_id.clone(),
        layer: layer_index,
        status: ArtifactStatus::Failed,
        at: Utc::now(),
    });
    Ok(JobOutcome {
        job_id: job.job_id.clone(),
        succeeded: 0,
        failed: job.produces.len(),
        skipped: 0,
        blocked_artifact_ids: job.produces.clone(),
    })
}

/// A job is never dispatched to its provider when one of its declared
/// inputs references an artifact that already failed earlier in this same
/// run: no provider call, no artifact event, and none of its produced
/// artifacts count toward the run's succeeded/failed/skipped totals.
pub fn skip_job(job: &JobDescriptor, layer_index: usize, upstream_artifact_id: &str, progress: &ProgressBus) -> JobOutcome {
    tracing::warn!(job_id = %job.job_id, upstream_artifact_id, "skipping job: upstream artifact failed this run");
    progress.publish(ProgressEvent::JobBlocked {
        job_id: job.job_id.clone(),
        layer: layer_index,
        upstream_artifact_id: upstream_artifact_id.to_string(),
        at: Utc::now(),
    });
    JobOutcome {
        job_id: job.job_id.clone(),
        succeeded: 0,
        failed: 0,
        skipped: 0,
        blocked_artifact_ids: job.produces.clone(),
    }
}
