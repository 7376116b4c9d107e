//! Blueprint document model: the declarative tree of inputs, artefacts,
//! producers, edges, and loops that the blueprint expander consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One declared input slot on a blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDecl {
    pub name: String,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
}

/// How a JSON-typed artifact's output decomposes into virtual sub-artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDecomposition {
    /// JSON-pointer-like path into the output schema, e.g. `segments`.
    pub path: String,
    /// Name of the input that holds the concrete element count.
    pub count_input: String,
}

/// A declared output of a producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtefactDecl {
    pub name: String,
    #[serde(default)]
    pub arrays: Option<ArrayDecomposition>,
}

/// One provider+model variant a producer may run under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerModelVariant {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub rate_key: Option<String>,
    #[serde(default)]
    pub output_schema: Option<Value>,
}

/// A logical producer: consumes inputs/artifacts, emits artifacts, maps to
/// one or more provider+model variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerDecl {
    pub name: String,
    pub models: Vec<ProducerModelVariant>,
    #[serde(default)]
    pub artefacts: Vec<ArtefactDecl>,
    /// Names of enclosing loop dimensions, outermost first.
    #[serde(default)]
    pub loops: Vec<String>,
    /// Canonical-relative input/artifact names this producer consumes.
    #[serde(default)]
    pub inputs: Vec<String>,
}

/// A data-dependency edge, optionally guarded by a condition evaluated after
/// loop-index substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDecl {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub condition: Option<String>,
}

/// A named loop dimension, sized by a count-input, optionally nested under
/// a parent dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopDecl {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub count_input: String,
}

/// One blueprint document: inputs, artefacts, producers, edges, loops, and
/// nested sub-blueprint children keyed by namespace segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlueprintDocument {
    #[serde(default)]
    pub inputs: Vec<InputDecl>,
    #[serde(default)]
    pub producers: Vec<ProducerDecl>,
    #[serde(default)]
    pub edges: Vec<EdgeDecl>,
    #[serde(default)]
    pub loops: Vec<LoopDecl>,
    #[serde(default)]
    pub producer_imports: Vec<String>,
    #[serde(default)]
    pub children: BTreeMap<String, BlueprintDocument>,
}

/// The full tree of blueprint documents rooted at the movie's top-level
/// blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintTree {
    pub root: BlueprintDocument,
}

/// User-supplied input values, keyed by bare (unprefixed) input name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputValues(pub BTreeMap<String, Value>);

impl InputValues {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }
}
