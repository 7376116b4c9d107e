//! # crucible-blueprint
//!
//! Expands a blueprint document tree into a flat producer graph: merges
//! nested sub-blueprints under their namespace, decomposes JSON-typed
//! artifacts into virtual sub-artifacts, instantiates loop dimensions into
//! concrete job instances, and resolves conditional edges by substituting
//! concrete loop indices. Rejects cyclic producer graphs.
//!
//! ## Modules
//!
//! - [`namespace`] — Merges nested blueprint children into one flat document
//! - [`condition`] — Small boolean-expression evaluator for conditional edges
//! - [`expand`] — The expansion procedure and `ProducerGraph` output type
//! - [`error`] — Blueprint expansion error taxonomy

pub mod condition;
pub mod error;
pub mod expand;
pub mod namespace;

pub use error::{BlueprintError, BlueprintResult};
pub use expand::{expand, ProducerGraph};
pub use crucible_types::blueprint::BlueprintDocument;
