//! The handler cache: built once per run via `warmStart`, then read-only
//! for the remainder of execution — no locking required (§5).

use std::collections::BTreeMap;
use std::sync::Arc;

use crucible_types::{HandlerCacheKey, JobDescriptor};

use crate::error::{ProviderError, ProviderResult};
use crate::handler::ProducerHandler;

/// Accumulates `(key, handler)` registrations before the run starts.
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: BTreeMap<HandlerCacheKey, Arc<dyn ProducerHandler>>,
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, key: HandlerCacheKey, handler: Arc<dyn ProducerHandler>) -> Self {
        self.handlers.insert(key, handler);
        self
    }

    /// Warm-starts every registered handler with the job descriptors it will
    /// be asked to produce, then freezes the registry.
    pub fn warm_start(self, descriptors: &[JobDescriptor]) -> ProviderResult<HandlerRegistry> {
        for (key, handler) in &self.handlers {
            let relevant: Vec<JobDescriptor> = descriptors
                .iter()
                .filter(|d| d.provider == key.provider && d.provider_model == key.model)
                .cloned()
                .collect();
            handler.warm_start(&relevant).map_err(|e| ProviderError::WarmStart {
                key: key.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(HandlerRegistry {
            handlers: self.handlers,
        })
    }
}

/// A frozen, read-only map of `(mode, provider, model, environment) -> handler`.
pub struct HandlerRegistry {
    handlers: BTreeMap<HandlerCacheKey, Arc<dyn ProducerHandler>>,
}

impl HandlerRegistry {
    pub fn get(&self, key: &HandlerCacheKey) -> ProviderResult<Arc<dyn ProducerHandler>> {
        self.handlers
            .get(key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownHandler(key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_types::{HandlerMode, ProduceRequest, ProduceResponse};

    struct NoopHandler;
    impl ProducerHandler for NoopHandler {
        fn mode(&self) -> HandlerMode {
            HandlerMode::Simulated
        }
        fn invoke(&self, _request: ProduceRequest) -> ProviderResult<ProduceResponse> {
            unreachable!()
        }
    }

    #[test]
    fn unregistered_key_is_an_error() {
        let registry = HandlerRegistryBuilder::new().warm_start(&[]).unwrap();
        let key = HandlerCacheKey::new("simulated", "acme", "v1", "test");
        assert!(matches!(registry.get(&key), Err(ProviderError::UnknownHandler(_))));
    }

    #[test]
    fn registered_key_resolves() {
        let key = HandlerCacheKey::new("simulated", "acme", "v1", "test");
        let registry = HandlerRegistryBuilder::new()
            .register(key.clone(), Arc::new(NoopHandler))
            .warm_start(&[])
            .unwrap();
        assert!(registry.get(&key).is_ok());
    }
}
