//! The `ProducerHandler` contract: `warmStart` once per run, then `invoke`
//! concurrently up to the runner's configured concurrency.

use crucible_types::{HandlerMode, JobDescriptor, ProduceRequest, ProduceResponse};

use crate::error::ProviderResult;

/// A pluggable producer backend. Implementations must be safe to call
/// concurrently: the runner invokes `invoke` from multiple worker threads
/// within a layer without additional synchronization.
pub trait ProducerHandler: Send + Sync {
    fn mode(&self) -> HandlerMode;

    /// Called once per run, before any job dispatches, with every job
    /// descriptor this handler will be asked to produce. Handlers that need
    /// no warm-up may use the default no-op implementation.
    fn warm_start(&self, _descriptors: &[JobDescriptor]) -> ProviderResult<()> {
        Ok(())
    }

    fn invoke(&self, request: ProduceRequest) -> ProviderResult<ProduceResponse>;
}
