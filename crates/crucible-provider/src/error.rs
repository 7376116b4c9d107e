use thiserror::Error;

use crucible_types::HandlerCacheKey;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no handler registered for {0:?}")]
    UnknownHandler(HandlerCacheKey),

    #[error("handler warm-start failed for {key:?}: {message}")]
    WarmStart { key: HandlerCacheKey, message: String },

    #[error("handler invoke failed: {0}")]
    Invoke(String),

    #[error("output schema is not valid JSON: {0}")]
    InvalidOutputSchema(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
