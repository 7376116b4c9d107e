//! Store-layer error taxonomy.

/// Errors that can terminate a run: malformed persistence layout, event-log
/// write failure, or a manifest-pointer race. Per §7 these always abort
/// immediately — they never belong to a single job.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("blob hash mismatch: expected {expected}, computed {computed}")]
    BlobHashMismatch { expected: String, computed: String },

    #[error("blob {hash} not found in store")]
    BlobNotFound { hash: String },

    #[error(
        "manifest save rejected: previous hash {expected} does not match current {actual}; reload and retry"
    )]
    ManifestConflict { expected: String, actual: String },

    #[error("no manifest exists yet for movie {movie_id}")]
    NoCurrentManifest { movie_id: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
