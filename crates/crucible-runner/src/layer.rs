//! Executes one layer with a bounded worker pool (§4.5): jobs are
//! dispatched in chunks of at most `concurrency`, mirroring the teacher's
//! `run_publish_level` wave-based batching.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use crucible_progress::ProgressBus;
use crucible_provider::HandlerRegistry;
use crucible_store::MovieStore;
use crucible_types::{JobDescriptor, ProgressEvent};

use crate::cancel::CancellationToken;
use crate::error::RunnerResult;
use crate::job::{self, JobOutcome};

pub struct LayerOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub skipped_for_cancellation: usize,
    /// Artifact ids no later layer in this run can rely on: produced by a
    /// job that failed, or by a job that was itself blocked.
    pub newly_blocked_artifact_ids: BTreeSet<String>,
}

#[allow(clippy::too_many_arguments)]
pub fn run_layer(
    jobs: &[JobDescriptor],
    layer_index: usize,
    revision: u64,
    mode: &str,
    environment: &str,
    concurrency: usize,
    handlers: &Arc<HandlerRegistry>,
    store: &Arc<dyn MovieStore>,
    progress: &ProgressBus,
    cancel: &CancellationToken,
    blocked_artifact_ids: &BTreeSet<String>,
) -> RunnerResult<LayerOutcome> {
    if jobs.is_empty() {
        progress.publish(ProgressEvent::LayerEmpty {
            layer: layer_index,
            at: Utc::now(),
        });
        return Ok(LayerOutcome {
            succeeded: 0,
            failed: 0,
            skipped: 0,
            skipped_for_cancellation: 0,
            newly_blocked_artifact_ids: BTreeSet::new(),
        });
    }

    progress.publish(ProgressEvent::LayerStart {
        layer: layer_index,
        job_count: jobs.len(),
        at: Utc::now(),
    });

    let mut newly_blocked_artifact_ids = BTreeSet::new();
    let mut runnable = Vec::new();
    for job in jobs {
        match job.inputs.iter().find(|input| blocked_artifact_ids.contains(*input)) {
            Some(upstream) => {
                let outcome = job::skip_job(job, layer_index, upstream, progress);
                newly_blocked_artifact_ids.extend(outcome.blocked_artifact_ids);
            }
            None => runnable.push(job.clone()),
        }
    }

    let concurrency = concurrency.max(1).min(runnable.len().max(1));
    let mut succeeded = 0;
    let mut failed = 0;
    let mut skipped = 0;
    let mut skipped_for_cancellation = 0;
    let mut first_error = None;

    for chunk in runnable.chunks(concurrency) {
        if cancel.is_cancelled() {
            skipped_for_cancellation += chunk.len();
            continue;
        }

        let handles: Vec<_> = chunk
            .iter()
            .map(|job| {
                let job = job.clone();
                let mode = mode.to_string();
                let environment = environment.to_string();
                let handlers = Arc::clone(handlers);
                let store = Arc::clone(store);
                let progress = progress.clone();
                thread::spawn(move || {
                    job::run_job(&job, revision, layer_index, 1, &mode, &environment, &handlers, store.as_ref(), &progress)
                })
            })
            .collect();

        for handle in handles {
            match handle.join().expect("job thread panicked") {
                Ok(JobOutcome {
                    succeeded: s,
                    failed: f,
                    skipped: sk,
                    blocked_artifact_ids: blocked,
                    ..
                }) => {
                    succeeded += s;
                    failed += f;
                    skipped += sk;
                    newly_blocked_artifact_ids.extend(blocked);
                }
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    progress.publish(ProgressEvent::LayerComplete {
        layer: layer_index,
        succeeded,
        failed,
        at: Utc::now(),
    });

    Ok(LayerOutcome {
        succeeded,
        failed,
        skipped,
        skipped_for_cancellation,
        newly_blocked_artifact_ids,
    })
}
