//! # crucible-provider
//!
//! The provider handler contract (§4.7): the `ProducerHandler` trait,
//! a warm-start-then-freeze handler cache keyed by `(mode, provider, model,
//! environment)`, and a simulated-mode handler that fabricates plausible
//! output from a producer's declared output schema for end-to-end testing
//! without external calls.
//!
//! ## Modules
//!
//! - [`handler`] — The `ProducerHandler` trait
//! - [`cache`] — `HandlerRegistryBuilder` / `HandlerRegistry`
//! - [`simulated`] — `SimulatedHandler`, the schema-driven fake
//! - [`error`] — Provider-facing error taxonomy

pub mod cache;
pub mod error;
pub mod handler;
pub mod simulated;

pub use cache::{HandlerRegistry, HandlerRegistryBuilder};
pub use error::{ProviderError, ProviderResult};
pub use handler::ProducerHandler;
pub use simulated::SimulatedHandler;
