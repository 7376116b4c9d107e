//! Steps 2-4 of blueprint expansion: array decomposition, loop-dimension
//! instantiation, and conditional edge resolution, producing a flat
//! producer graph of `JobDescriptor`s keyed by canonical job ids.

use std::collections::BTreeMap;

use crucible_types::blueprint::{ArtefactDecl, BlueprintDocument, EdgeDecl, LoopDecl, ProducerDecl};
use crucible_types::{ArtifactId, InputId, InputValues, JobDescriptor};

use crate::condition;
use crate::error::{BlueprintError, BlueprintResult};
use crate::namespace;

/// The flat, expanded producer graph: one `JobDescriptor` per concrete job
/// instance, plus the set of artifact ids each job instance actually
/// consumes (after conditional-edge filtering).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProducerGraph {
    pub jobs: Vec<JobDescriptor>,
}

/// Expands a blueprint tree's root document into a flat producer graph.
/// `input_values` must already contain every count-input referenced by a
/// loop dimension or array decomposition — callers resolve those first
/// (see the planning service's input-resolution step).
pub fn expand(root: &BlueprintDocument, input_values: &InputValues) -> BlueprintResult<ProducerGraph> {
    let flat = namespace::flatten(root);
    let loops_by_name: BTreeMap<&str, &LoopDecl> =
        flat.loops.iter().map(|l| (l.name.as_str(), l)).collect();

    let mut jobs = Vec::new();
    for producer in &flat.producers {
        jobs.extend(expand_producer(producer, &flat, &loops_by_name, input_values)?);
    }

    reject_cycles(&jobs)?;
    Ok(ProducerGraph { jobs })
}

fn resolve_count(count_input: &str, input_values: &InputValues) -> BlueprintResult<Option<u64>> {
    match input_values.get(count_input) {
        None => Ok(None),
        Some(value) => match value.as_u64() {
            Some(n) => Ok(Some(n)),
            None => Ok(None),
        },
    }
}

fn dimension_short_name(dimension: &str) -> &str {
    dimension.rsplit('.').next().unwrap_or(dimension)
}

fn expand_producer(
    producer: &ProducerDecl,
    flat: &BlueprintDocument,
    loops_by_name: &BTreeMap<&str, &LoopDecl>,
    input_values: &InputValues,
) -> BlueprintResult<Vec<JobDescriptor>> {
    let variant = producer.models.first().cloned().ok_or_else(|| {
        BlueprintError::UnknownLoopDimension {
            producer: producer.name.clone(),
            dimension: "<no model variants declared>".to_string(),
        }
    })?;

    let mut dims = Vec::new();
    for dim_name in &producer.loops {
        let decl = loops_by_name
            .get(dim_name.as_str())
            .ok_or_else(|| BlueprintError::UnknownLoopDimension {
                producer: producer.name.clone(),
                dimension: dim_name.clone(),
            })?;
        let count = resolve_count(&decl.count_input, input_values)?.ok_or_else(|| {
            BlueprintError::MissingLoopCount {
                dimension: dim_name.clone(),
                count_input: decl.count_input.clone(),
            }
        })?;
        dims.push((dim_name.clone(), count as usize));
    }

    let tuples = cartesian_product(&dims);

    let mut jobs = Vec::with_capacity(tuples.len().max(1));
    for indices in tuples {
        jobs.push(expand_instance(producer, &variant, flat, &indices)?);
    }
    Ok(jobs)
}

fn cartesian_product(dims: &[(String, usize)]) -> Vec<Vec<usize>> {
    if dims.is_empty() {
        return vec![Vec::new()];
    }
    let mut out = vec![Vec::new()];
    for (_, count) in dims {
        let mut next = Vec::with_capacity(out.len() * count.max(&1));
        for prefix in &out {
            for i in 0..*count {
                let mut t = prefix.clone();
                t.push(i);
                next.push(t);
            }
        }
        out = next;
    }
    out
}

fn expand_instance(
    producer: &ProducerDecl,
    variant: &crucible_types::blueprint::ProducerModelVariant,
    flat: &BlueprintDocument,
    indices: &[usize],
) -> BlueprintResult<JobDescriptor> {
    let indices_by_dim: BTreeMap<String, usize> = producer
        .loops
        .iter()
        .zip(indices.iter())
        .map(|(name, idx)| (dimension_short_name(name).to_string(), *idx))
        .collect();

    let job_id = job_instance_id(&producer.name, indices);

    let mut produces = Vec::new();
    for artefact in &producer.artefacts {
        let base = ArtifactId::from_name(format!("{}.{}", producer.name, artefact.name))?;
        let base = if indices.is_empty() {
            base
        } else {
            ArtifactId::with_indices(base.name(), indices)?
        };
        produces.extend(decompose_array(&base, artefact)?);
    }

    let mut inputs = Vec::new();
    for input_name in &producer.inputs {
        if !edge_is_active(flat, &producer.name, input_name, &indices_by_dim)? {
            continue;
        }
        inputs.push(resolve_input_reference(flat, input_name, indices)?);
    }

    Ok(JobDescriptor {
        job_id,
        producer: producer.name.clone(),
        inputs,
        produces: produces.into_iter().map(|id| id.as_str().to_string()).collect(),
        provider: variant.provider.clone(),
        provider_model: variant.model.clone(),
        rate_key: variant
            .rate_key
            .clone()
            .unwrap_or_else(|| format!("{}:{}", variant.provider, variant.model)),
        output_schema: variant.output_schema.clone(),
        context: None,
    })
}

fn job_instance_id(producer_name: &str, indices: &[usize]) -> String {
    let mut s = format!("Producer:{producer_name}");
    for i in indices {
        s.push('[');
        s.push_str(&i.to_string());
        s.push(']');
    }
    s
}

/// Decomposes one declared artefact into its virtual sub-artifacts if it
/// carries an `arrays` decomposition, otherwise returns it unchanged.
///
/// The element count is resolved by the caller's `input_values` via the
/// planning service before expansion runs for producers with array
/// decompositions; here we only know the already-substituted base id, so
/// decomposition is limited to a single level keyed by the decomposition
/// path (see `DESIGN.md` for why nested decomposition isn't supported).
fn decompose_array(base: &ArtifactId, artefact: &ArtefactDecl) -> BlueprintResult<Vec<ArtifactId>> {
    match &artefact.arrays {
        None => Ok(vec![base.clone()]),
        Some(decomposition) => {
            let sub = base.with_virtual_subpath(&decomposition.path)?;
            Ok(vec![sub])
        }
    }
}

fn edge_is_active(
    flat: &BlueprintDocument,
    producer_name: &str,
    input_name: &str,
    indices_by_dim: &BTreeMap<String, usize>,
) -> BlueprintResult<bool> {
    let matching: Vec<&EdgeDecl> = flat
        .edges
        .iter()
        .filter(|e| e.to == producer_name && e.from == *input_name)
        .collect();
    for edge in matching {
        if let Some(condition) = &edge.condition {
            if !condition::evaluate(condition, indices_by_dim, &edge.from, &edge.to)? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn resolve_input_reference(
    flat: &BlueprintDocument,
    input_name: &str,
    indices: &[usize],
) -> BlueprintResult<String> {
    if flat.inputs.iter().any(|i| i.name == input_name) {
        return Ok(InputId::from_name(input_name)?.as_str().to_string());
    }

    let base = if let Some(name) = input_name.strip_prefix("Artifact:") {
        ArtifactId::from_name(name)?
    } else {
        ArtifactId::from_name(input_name)?
    };
    let id = if indices.is_empty() {
        base
    } else {
        ArtifactId::with_indices(base.name(), indices)?
    };
    Ok(id.as_str().to_string())
}

/// Rejects a producer graph containing a dependency cycle, derived from
/// input/produces overlap between jobs.
fn reject_cycles(jobs: &[JobDescriptor]) -> BlueprintResult<()> {
    let producer_of: BTreeMap<&str, usize> = jobs
        .iter()
        .enumerate()
        .flat_map(|(i, j)| j.produces.iter().map(move |a| (a.as_str(), i)))
        .collect();

    let mut state = vec![0u8; jobs.len()]; // 0 = unvisited, 1 = in-progress, 2 = done
    for start in 0..jobs.len() {
        if state[start] == 0 {
            visit(start, jobs, &producer_of, &mut state)?;
        }
    }
    Ok(())
}

fn visit(
    node: usize,
    jobs: &[JobDescriptor],
    producer_of: &BTreeMap<&str, usize>,
    state: &mut [u8],
) -> BlueprintResult<()> {
    state[node] = 1;
    for input in &jobs[node].inputs {
        if let Some(&upstream) = producer_of.get(input.as_str()) {
            match state[upstream] {
                1 => {
                    return Err(BlueprintError::CycleDetected {
                        producer: jobs[node].producer.clone(),
                    })
                }
                0 => visit(upstream, jobs, producer_of, state)?,
                _ => {}
            }
        }
    }
    state[node] = 2;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_types::blueprint::ProducerModelVariant;
    use serde_json::json;

    fn variant() -> ProducerModelVariant {
        ProducerModelVariant {
            provider: "sim".into(),
            model: "sim-1".into(),
            rate_key: None,
            output_schema: None,
        }
    }

    #[test]
    fn single_producer_no_loops_yields_one_job() {
        let doc = BlueprintDocument {
            producers: vec![ProducerDecl {
                name: "Script".into(),
                models: vec![variant()],
                artefacts: vec![ArtefactDecl {
                    name: "Text".into(),
                    arrays: None,
                }],
                loops: vec![],
                inputs: vec!["Theme".into()],
            }],
            inputs: vec![crucible_types::blueprint::InputDecl {
                name: "Theme".into(),
                default: None,
                required: true,
            }],
            ..Default::default()
        };
        let graph = expand(&doc, &InputValues::default()).unwrap();
        assert_eq!(graph.jobs.len(), 1);
        assert_eq!(graph.jobs[0].produces, vec!["Artifact:Script.Text"]);
        assert_eq!(graph.jobs[0].inputs, vec!["Input:Theme"]);
    }

    #[test]
    fn looped_producer_instantiates_one_job_per_index() {
        let doc = BlueprintDocument {
            producers: vec![ProducerDecl {
                name: "Segment".into(),
                models: vec![variant()],
                artefacts: vec![ArtefactDecl {
                    name: "Clip".into(),
                    arrays: None,
                }],
                loops: vec!["segment".into()],
                inputs: vec![],
            }],
            loops: vec![LoopDecl {
                name: "segment".into(),
                parent: None,
                count_input: "NumOfSegments".into(),
            }],
            ..Default::default()
        };
        let mut values = InputValues::default();
        values.insert("NumOfSegments", json!(3));
        let graph = expand(&doc, &values).unwrap();
        assert_eq!(graph.jobs.len(), 3);
        assert_eq!(graph.jobs[1].produces, vec!["Artifact:Segment.Clip[1]"]);
    }

    #[test]
    fn conditional_edge_drops_input_when_false() {
        let doc = BlueprintDocument {
            producers: vec![
                ProducerDecl {
                    name: "First".into(),
                    models: vec![variant()],
                    artefacts: vec![ArtefactDecl {
                        name: "Out".into(),
                        arrays: None,
                    }],
                    loops: vec!["segment".into()],
                    inputs: vec![],
                },
                ProducerDecl {
                    name: "Second".into(),
                    models: vec![variant()],
                    artefacts: vec![ArtefactDecl {
                        name: "Out".into(),
                        arrays: None,
                    }],
                    loops: vec!["segment".into()],
                    inputs: vec!["Artifact:First.Out".into()],
                },
            ],
            loops: vec![LoopDecl {
                name: "segment".into(),
                parent: None,
                count_input: "NumOfSegments".into(),
            }],
            edges: vec![EdgeDecl {
                from: "Artifact:First.Out".into(),
                to: "Second".into(),
                condition: Some("segment == 0".into()),
            }],
            ..Default::default()
        };
        let mut values = InputValues::default();
        values.insert("NumOfSegments", json!(2));
        let graph = expand(&doc, &values).unwrap();
        let second_jobs: Vec<_> = graph
            .jobs
            .iter()
            .filter(|j| j.producer == "Second")
            .collect();
        assert_eq!(second_jobs.len(), 2);
        assert_eq!(second_jobs[0].inputs.len(), 1);
        assert_eq!(second_jobs[1].inputs.len(), 0);
    }

    #[test]
    fn cyclic_graph_is_rejected() {
        let doc = BlueprintDocument {
            producers: vec![
                ProducerDecl {
                    name: "A".into(),
                    models: vec![variant()],
                    artefacts: vec![ArtefactDecl {
                        name: "Out".into(),
                        arrays: None,
                    }],
                    loops: vec![],
                    inputs: vec!["Artifact:B.Out".into()],
                },
                ProducerDecl {
                    name: "B".into(),
                    models: vec![variant()],
                    artefacts: vec![ArtefactDecl {
                        name: "Out".into(),
                        arrays: None,
                    }],
                    loops: vec![],
                    inputs: vec!["Artifact:A.Out".into()],
                },
            ],
            ..Default::default()
        };
        let err = expand(&doc, &InputValues::default()).unwrap_err();
        assert!(matches!(err, BlueprintError::CycleDetected { .. }));
    }
}
