//! Errors surfaced while expanding a blueprint tree into a flat producer
//! graph. These are all planning-phase, user-input errors: surfaced
//! synchronously, nothing is persisted.

#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error("blueprint graph contains a cycle through producer {producer}")]
    CycleDetected { producer: String },

    #[error("loop dimension {dimension} has no count input named {count_input}")]
    MissingLoopCount {
        dimension: String,
        count_input: String,
    },

    #[error("count input {count_input} for loop dimension {dimension} is not a non-negative integer")]
    InvalidLoopCount {
        dimension: String,
        count_input: String,
    },

    #[error("producer {producer} references unknown loop dimension {dimension}")]
    UnknownLoopDimension { producer: String, dimension: String },

    #[error("array decomposition on producer {producer} has no count input named {count_input}")]
    MissingArrayCount {
        producer: String,
        count_input: String,
    },

    #[error("malformed edge condition {condition:?} on edge {from} -> {to}: {reason}")]
    InvalidCondition {
        from: String,
        to: String,
        condition: String,
        reason: String,
    },

    #[error("non-canonical id: {0}")]
    NonCanonicalId(#[from] crucible_types::IdError),

    #[error("invalid output schema JSON on producer {producer}: {source}")]
    InvalidOutputSchemaJson {
        producer: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type BlueprintResult<T> = Result<T, BlueprintError>;
