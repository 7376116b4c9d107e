//! Step 1 of blueprint expansion: merge inline child blueprints into a
//! single flat document by namespacing producer, loop, and edge names
//! with their dotted ancestor path (`Parent.Child.Producer`).

use crucible_types::blueprint::{BlueprintDocument, EdgeDecl, LoopDecl, ProducerDecl};

/// Flattens a `BlueprintTree`'s nested children into one document whose
/// producer/loop names carry their full dotted namespace path.
pub fn flatten(root: &BlueprintDocument) -> BlueprintDocument {
    let mut out = BlueprintDocument {
        inputs: root.inputs.clone(),
        producers: Vec::new(),
        edges: Vec::new(),
        loops: Vec::new(),
        producer_imports: root.producer_imports.clone(),
        children: Default::default(),
    };
    collect(root, "", &mut out);
    out
}

fn collect(doc: &BlueprintDocument, prefix: &str, out: &mut BlueprintDocument) {
    for producer in &doc.producers {
        out.producers.push(namespaced_producer(producer, prefix));
    }
    for edge in &doc.edges {
        out.edges.push(EdgeDecl {
            from: namespace_name(&edge.from, prefix),
            to: namespace_name(&edge.to, prefix),
            condition: edge.condition.clone(),
        });
    }
    for loop_decl in &doc.loops {
        out.loops.push(LoopDecl {
            name: namespace_name(&loop_decl.name, prefix),
            parent: loop_decl
                .parent
                .as_ref()
                .map(|p| namespace_name(p, prefix)),
            count_input: loop_decl.count_input.clone(),
        });
    }
    for (child_name, child_doc) in &doc.children {
        let child_prefix = if prefix.is_empty() {
            child_name.clone()
        } else {
            format!("{prefix}.{child_name}")
        };
        collect(child_doc, &child_prefix, out);
    }
}

fn namespaced_producer(producer: &ProducerDecl, prefix: &str) -> ProducerDecl {
    ProducerDecl {
        name: namespace_name(&producer.name, prefix),
        models: producer.models.clone(),
        artefacts: producer.artefacts.clone(),
        loops: producer
            .loops
            .iter()
            .map(|l| namespace_name(l, prefix))
            .collect(),
        inputs: producer.inputs.clone(),
    }
}

fn namespace_name(name: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_types::blueprint::ProducerModelVariant;
    use std::collections::BTreeMap;

    fn producer(name: &str) -> ProducerDecl {
        ProducerDecl {
            name: name.to_string(),
            models: vec![ProducerModelVariant {
                provider: "sim".into(),
                model: "sim-1".into(),
                rate_key: None,
                output_schema: None,
            }],
            artefacts: vec![],
            loops: vec![],
            inputs: vec![],
        }
    }

    #[test]
    fn nested_child_producers_get_dotted_names() {
        let mut children = BTreeMap::new();
        children.insert(
            "Scene".to_string(),
            BlueprintDocument {
                producers: vec![producer("Render")],
                ..Default::default()
            },
        );
        let root = BlueprintDocument {
            producers: vec![producer("Script")],
            children,
            ..Default::default()
        };

        let flat = flatten(&root);
        let names: Vec<&str> = flat.producers.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"Script"));
        assert!(names.contains(&"Scene.Render"));
    }
}
