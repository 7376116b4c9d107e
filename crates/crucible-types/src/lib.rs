//! # crucible-types
//!
//! Domain types shared by every crate in the crucible content-addressed
//! media build engine: canonical IDs, event records, manifests, blueprint
//! documents, execution plans, the provider contract, progress events, and
//! runtime configuration.
//!
//! Nothing in this crate touches the filesystem or a clock beyond what
//! `chrono::Utc::now()` and `serde_json` already assume — it is pure data
//! plus the canonicalization and ID-parsing logic every other crate depends
//! on for determinism.
//!
//! ## Modules
//!
//! - [`ids`] — Canonical ID grammar and parsing (`Input:<Name>`,
//!   `Producer:<Alias>`, `Artifact:<Alias>.<Name>[<dim>]…`)
//! - [`canon`] — Canonical JSON serialization and SHA-256 content hashing
//! - [`blob`] — Content-addressed blob references and MIME/extension mapping
//! - [`events`] — Append-only event record shapes (`InputEvent`, `ArtefactEvent`)
//! - [`manifest`] — The compacted latest-event-wins manifest view
//! - [`blueprint`] — The declarative blueprint document model
//! - [`plan`] — Job descriptors and layered execution plans
//! - [`provider`] — The provider handler contract (produce request/response)
//! - [`progress`] — Progress bus event payloads
//! - [`config`] — Layered `RuntimeConfig` (TOML defaults + explicit overrides)

pub mod blob;
pub mod blueprint;
pub mod canon;
pub mod config;
pub mod events;
pub mod ids;
pub mod manifest;
pub mod plan;
pub mod progress;
pub mod provider;

pub use blob::BlobRef;
pub use blueprint::InputValues;
pub use canon::Hash;
pub use config::{ConfigError, RuntimeConfig, RuntimeConfigOverrides};
pub use events::{ArtefactEvent, ArtifactStatus, Diagnostics, EditedBy, InputEvent, InputPayload};
pub use ids::{ArtifactId, IdError, InputId, ProducerId};
pub use manifest::{
    CurrentPointer, Manifest, ManifestArtifactEntry, ManifestInputEntry, Revision, RunConfig,
};
pub use plan::{DirtyExplanation, DirtyReason, ExecutionPlan, JobDescriptor, PlanScope};
pub use progress::ProgressEvent;
pub use provider::{
    ArtifactBlobData, ArtifactResult, HandlerCacheKey, HandlerMode, PlannerContext, ProduceContext,
    ProduceContextExtras, ProduceRequest, ProduceResponse, ProviderDiagnostics, ResolvedInput,
    ResolvedValue,
};
