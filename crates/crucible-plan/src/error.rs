//! Planning-phase error taxonomy. All variants are user-input errors per
//! §7: surfaced synchronously, and when one is returned the plan is not
//! produced and nothing is persisted.

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("INVALID_PIN_ID: {0} is not a valid artifact id")]
    InvalidPinId(String),

    #[error("PIN_TARGET_NOT_REUSABLE: pinned artifact {0} has no succeeded event or manifest entry")]
    PinTargetNotReusable(String),

    #[error("ARTIFACT_NOT_IN_MANIFEST: surgical target {0} is not in the manifest")]
    ArtifactNotInManifest(String),

    #[error("ARTIFACT_JOB_NOT_FOUND: no job in the producer graph produces {0}")]
    ArtifactJobNotFound(String),

    #[error("INVALID_OUTPUT_SCHEMA_JSON: {0}")]
    InvalidOutputSchemaJson(String),

    #[error("NON_CANONICAL_INPUT_ID: {0}")]
    NonCanonicalInputId(String),

    #[error("INVALID_BLOB_PAYLOAD: input {input} has an invalid blob payload: {reason}")]
    InvalidBlobPayload { input: String, reason: String },

    #[error("pin and surgical target conflict on the same artifact: {0}")]
    PinSurgicalConflict(String),

    #[error("blueprint expansion failed: {0}")]
    Blueprint(#[from] crucible_blueprint::BlueprintError),

    #[error(transparent)]
    Store(#[from] crucible_store::StoreError),
}

pub type PlanResult<T> = Result<T, PlanError>;
