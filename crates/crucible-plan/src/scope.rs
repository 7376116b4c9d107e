//! Scope controls applied after dirty-set computation: `reRunFrom`,
//! `upToLayer`, surgical `targetArtifactIds`, and `pinnedArtifactIds`.

use std::collections::{BTreeMap, BTreeSet};

use crucible_types::{ArtifactId, ArtifactStatus, DirtyExplanation, DirtyReason, JobDescriptor, Manifest};

use crate::dirty::ArtefactEventsById;
use crate::error::{PlanError, PlanResult};

/// Applies every scope control in `scope` to `explanation`, given the full
/// producer graph and each job's full-graph layer assignment.
pub fn apply_scope(
    mut explanation: DirtyExplanation,
    graph: &[JobDescriptor],
    manifest: &Manifest,
    artefact_events: &ArtefactEventsById<'_>,
    full_layers: &BTreeMap<String, usize>,
    scope: &crucible_types::PlanScope,
) -> PlanResult<DirtyExplanation> {
    let conflict = scope
        .pinned_artifact_ids
        .iter()
        .find(|id| scope.target_artifact_ids.contains(id));
    if let Some(id) = conflict {
        return Err(PlanError::PinSurgicalConflict(id.clone()));
    }

    for id in &scope.pinned_artifact_ids {
        ArtifactId::parse(id.clone()).map_err(|_| PlanError::InvalidPinId(id.clone()))?;
        let reusable = artefact_events
            .get(id.as_str())
            .map(|e| e.is_succeeded())
            .unwrap_or(false)
            || manifest
                .artefacts
                .get(id)
                .map(|e| e.status == ArtifactStatus::Succeeded)
                .unwrap_or(false);
        if !reusable {
            return Err(PlanError::PinTargetNotReusable(id.clone()));
        }
    }

    if let Some(k) = scope.re_run_from {
        for job in graph {
            if full_layers.get(&job.job_id).copied().unwrap_or(0) >= k {
                explanation
                    .entry(job.job_id.clone())
                    .or_insert(DirtyReason::Propagated);
            }
        }
    }

    if !scope.target_artifact_ids.is_empty() {
        let producer_of: BTreeMap<&str, &str> = graph
            .iter()
            .flat_map(|j| j.produces.iter().map(move |a| (a.as_str(), j.job_id.as_str())))
            .collect();

        let mut keep: BTreeSet<String> = BTreeSet::new();
        for target in &scope.target_artifact_ids {
            if !manifest.artefacts.contains_key(target) {
                return Err(PlanError::ArtifactNotInManifest(target.clone()));
            }
            let producing_job = producer_of
                .get(target.as_str())
                .ok_or_else(|| PlanError::ArtifactJobNotFound(target.clone()))?;
            keep.insert(producing_job.to_string());
            collect_downstream(producing_job, graph, &mut keep);
        }
        explanation.retain(|job_id, _| keep.contains(job_id));
        for job_id in &keep {
            explanation
                .entry(job_id.clone())
                .or_insert(DirtyReason::Propagated);
        }
    }

    if !scope.pinned_artifact_ids.is_empty() {
        let pinned: BTreeSet<&str> = scope.pinned_artifact_ids.iter().map(|s| s.as_str()).collect();
        explanation.retain(|job_id, _| {
            let job = graph.iter().find(|j| &j.job_id == job_id);
            match job {
                Some(j) => !j.produces.iter().all(|a| pinned.contains(a.as_str())),
                None => true,
            }
        });
    }

    if let Some(k) = scope.up_to_layer {
        explanation.retain(|job_id, _| full_layers.get(job_id).copied().unwrap_or(0) <= k);
    }

    Ok(explanation)
}

fn collect_downstream(job_id: &str, graph: &[JobDescriptor], keep: &mut BTreeSet<String>) {
    let produced: BTreeSet<&str> = graph
        .iter()
        .find(|j| j.job_id == job_id)
        .map(|j| j.produces.iter().map(|s| s.as_str()).collect())
        .unwrap_or_default();
    for job in graph {
        if keep.contains(&job.job_id) {
            continue;
        }
        if job.inputs.iter().any(|i| produced.contains(i.as_str())) {
            keep.insert(job.job_id.clone());
            collect_downstream(&job.job_id, graph, keep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_types::Revision;

    fn job(id: &str, inputs: &[&str], produces: &[&str]) -> JobDescriptor {
        JobDescriptor {
            job_id: id.into(),
            producer: id.into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            produces: produces.iter().map(|s| s.to_string()).collect(),
            provider: "sim".into(),
            provider_model: "sim-1".into(),
            rate_key: "sim:sim-1".into(),
            output_schema: None,
            context: None,
        }
    }

    #[test]
    fn up_to_layer_drops_higher_layers() {
        let graph = vec![job("a", &[], &["A"]), job("b", &["A"], &["B"])];
        let mut explanation = DirtyExplanation::new();
        explanation.insert("a".to_string(), DirtyReason::Initial);
        explanation.insert("b".to_string(), DirtyReason::Initial);
        let mut layers = BTreeMap::new();
        layers.insert("a".to_string(), 0);
        layers.insert("b".to_string(), 1);

        let manifest = Manifest::empty(Revision(0));
        let events = crate::dirty::compact_artefact_events(&[]);
        let scope = crucible_types::PlanScope {
            up_to_layer: Some(0),
            ..Default::default()
        };
        let result = apply_scope(explanation, &graph, &manifest, &events, &layers, &scope).unwrap();
        assert!(result.contains_key("a"));
        assert!(!result.contains_key("b"));
    }

    #[test]
    fn pin_and_target_conflict_is_rejected() {
        let graph = vec![job("a", &[], &["A"])];
        let explanation = DirtyExplanation::new();
        let manifest = Manifest::empty(Revision(0));
        let events = crate::dirty::compact_artefact_events(&[]);
        let scope = crucible_types::PlanScope {
            target_artifact_ids: vec!["A".to_string()],
            pinned_artifact_ids: vec!["A".to_string()],
            ..Default::default()
        };
        let err = apply_scope(explanation, &graph, &manifest, &events, &BTreeMap::new(), &scope)
            .unwrap_err();
        assert!(matches!(err, PlanError::PinSurgicalConflict(_)));
    }
}
