//! `executePlan` (§6): runs every layer of an `ExecutionPlan` in order,
//! with hard barriers between layers, honoring an optional runner-level
//! `upToLayer` override and cooperative cancellation.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use crucible_progress::ProgressBus;
use crucible_provider::HandlerRegistry;
use crucible_store::MovieStore;
use crucible_types::{ExecutionPlan, ProgressEvent};

use crate::cancel::CancellationToken;
use crate::error::RunnerResult;
use crate::layer;

/// Runner-level knobs, distinct from the planning-time `PlanScope`: the
/// control surface lets a caller skip trailing layers of an already-built
/// plan without replanning (§6 `executePlan({concurrency, upToLayer, ...})`).
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub concurrency: usize,
    pub up_to_layer: Option<usize>,
    pub mode: String,
    pub environment: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            up_to_layer: None,
            mode: "simulated".to_string(),
            environment: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Failed,
    Cancelled,
}

pub struct RunResult {
    pub status: RunStatus,
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub fn execute_plan(
    plan: &ExecutionPlan,
    store: Arc<dyn MovieStore>,
    handlers: Arc<HandlerRegistry>,
    progress: &ProgressBus,
    cancel: &CancellationToken,
    options: &RunOptions,
) -> RunnerResult<RunResult> {
    let mut total_succeeded = 0;
    let mut total_failed = 0;
    let mut total_skipped = 0;
    let total_jobs = plan.job_count();
    let mut blocked_artifact_ids: BTreeSet<String> = BTreeSet::new();

    for (layer_index, jobs) in plan.layers.iter().enumerate() {
        if let Some(k) = options.up_to_layer {
            if layer_index > k {
                progress.publish(ProgressEvent::LayerSkipped {
                    layer: layer_index,
                    reason: format!("beyond upToLayer={k}"),
                    at: Utc::now(),
                });
                continue;
            }
        }

        if cancel.is_cancelled() {
            progress.publish(ProgressEvent::Cancelled {
                at_layer: layer_index,
                at: Utc::now(),
            });
            break;
        }

        let outcome = layer::run_layer(
            jobs,
            layer_index,
            plan.revision.0,
            &options.mode,
            &options.environment,
            options.concurrency,
            &handlers,
            &store,
            progress,
            cancel,
            &blocked_artifact_ids,
        )?;

        total_succeeded += outcome.succeeded;
        total_failed += outcome.failed;
        total_skipped += outcome.skipped;
        blocked_artifact_ids.extend(outcome.newly_blocked_artifact_ids);
    }

    let status = if cancel.is_cancelled() {
        RunStatus::Cancelled
    } else if total_failed == 0 {
        RunStatus::Succeeded
    } else {
        RunStatus::Failed
    };

    progress.publish(ProgressEvent::ExecutionComplete {
        total_jobs,
        succeeded: total_succeeded,
        failed: total_failed,
        skipped: total_skipped,
        at: Utc::now(),
    });

    Ok(RunResult {
        status,
        total_jobs,
        succeeded: total_succeeded,
        failed: total_failed,
        skipped: total_skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_provider::{HandlerRegistryBuilder, SimulatedHandler};
    use crucible_store::InMemoryMovieStore;
    use crucible_types::{HandlerCacheKey, JobDescriptor, Revision};

    fn job(id: &str, produces: &[&str]) -> JobDescriptor {
        job_with_inputs(id, &[], produces)
    }

    fn job_with_inputs(id: &str, inputs: &[&str], produces: &[&str]) -> JobDescriptor {
        JobDescriptor {
            job_id: id.to_string(),
            producer: id.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            produces: produces.iter().map(|s| s.to_string()).collect(),
            provider: "acme".to_string(),
            provider_model: "v1".to_string(),
            rate_key: "acme:v1".to_string(),
            output_schema: None,
            context: None,
        }
    }

    fn plan(layers: Vec<Vec<JobDescriptor>>) -> ExecutionPlan {
        ExecutionPlan {
            revision: Revision(1),
            manifest_base_hash: None,
            created_at: Utc::now(),
            blueprint_layer_count: layers.len(),
            layers,
        }
    }

    #[test]
    fn single_layer_run_succeeds_with_simulated_handler() {
        let store: Arc<dyn MovieStore> = Arc::new(InMemoryMovieStore::new("m1"));
        let handlers = Arc::new(
            HandlerRegistryBuilder::new()
                .register(
                    HandlerCacheKey::new("simulated", "acme", "v1", "default"),
                    Arc::new(SimulatedHandler),
                )
                .warm_start(&[])
                .unwrap(),
        );
        let progress = ProgressBus::new();
        let cancel = CancellationToken::new();
        let plan = plan(vec![vec![job("Producer:Scene", &["Artifact:Scene.Out"])]]);

        let result = execute_plan(&plan, store, handlers, &progress, &cancel, &RunOptions::default()).unwrap();
        assert_eq!(result.status, RunStatus::Succeeded);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 0);
    }

    #[test]
    fn up_to_layer_skips_trailing_layers() {
        let store: Arc<dyn MovieStore> = Arc::new(InMemoryMovieStore::new("m1"));
        let handlers = Arc::new(
            HandlerRegistryBuilder::new()
                .register(
                    HandlerCacheKey::new("simulated", "acme", "v1", "default"),
                    Arc::new(SimulatedHandler),
                )
                .warm_start(&[])
                .unwrap(),
        );
        let progress = ProgressBus::new();
        let cancel = CancellationToken::new();
        let plan = plan(vec![
            vec![job("Producer:A", &["Artifact:A.Out"])],
            vec![job("Producer:B", &["Artifact:B.Out"])],
        ]);

        let options = RunOptions {
            up_to_layer: Some(0),
            ..RunOptions::default()
        };
        let result = execute_plan(&plan, store, handlers, &progress, &cancel, &options).unwrap();
        assert_eq!(result.succeeded, 1);
    }

    #[test]
    fn downstream_job_is_skipped_when_upstream_artifact_failed_this_run() {
        use crucible_provider::error::{ProviderError, ProviderResult};
        use crucible_provider::ProducerHandler;
        use crucible_types::provider::{HandlerMode, ProduceRequest, ProduceResponse};

        struct ThrowingHandler;
        impl ProducerHandler for ThrowingHandler {
            fn mode(&self) -> HandlerMode {
                HandlerMode::Simulated
            }
            fn invoke(&self, _request: ProduceRequest) -> ProviderResult<ProduceResponse> {
                Err(ProviderError::Invoke("boom".to_string()))
            }
        }

        let store: Arc<dyn MovieStore> = Arc::new(InMemoryMovieStore::new("m1"));
        let handlers = Arc::new(
            HandlerRegistryBuilder::new()
                .register(HandlerCacheKey::new("simulated", "acme", "v1", "default"), Arc::new(ThrowingHandler))
                .warm_start(&[])
                .unwrap(),
        );
        let progress = ProgressBus::new();
        let cancel = CancellationToken::new();
        let plan = plan(vec![
            vec![job("Producer:A", &["Artifact:A.Out"])],
            vec![job_with_inputs("Producer:B", &["Artifact:A.Out"], &["Artifact:B.Out"])],
        ]);

        let result = execute_plan(&plan, Arc::clone(&store), handlers, &progress, &cancel, &RunOptions::default()).unwrap();
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.succeeded, 0);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 0);

        let events = store.read_artefact_events().unwrap();
        assert!(events.iter().any(|e| e.artefact_id.as_str() == "Artifact:A.Out"));
        assert!(!events.iter().any(|e| e.artefact_id.as_str() == "Artifact:B.Out"));
    }

    #[test]
    fn cancellation_before_start_yields_cancelled_status() {
        let store: Arc<dyn MovieStore> = Arc::new(InMemoryMovieStore::new("m1"));
        let handlers = Arc::new(HandlerRegistryBuilder::new().warm_start(&[]).unwrap());
        let progress = ProgressBus::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let plan = plan(vec![vec![job("Producer:A", &["Artifact:A.Out"])]]);

        let result = execute_plan(&plan, store, handlers, &progress, &cancel, &RunOptions::default()).unwrap();
        assert_eq!(result.status, RunStatus::Cancelled);
    }
}
