use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("store error: {0}")]
    Store(#[from] crucible_store::StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] crucible_provider::ProviderError),

    #[error("job {job_id} declares an unparsable input id: {input_id}")]
    InvalidInputId { job_id: String, input_id: String },
}

pub type RunnerResult<T> = Result<T, RunnerError>;
