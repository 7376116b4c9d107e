use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] crucible_store::StoreError),

    #[error(transparent)]
    Plan(#[from] crucible_plan::PlanError),

    #[error(transparent)]
    Runner(#[from] crucible_runner::RunnerError),

    #[error(transparent)]
    Config(#[from] crucible_types::ConfigError),
}

pub type CoreResult<T> = Result<T, CoreError>;
