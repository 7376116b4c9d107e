//! # crucible-runner
//!
//! The layered, bounded-concurrency runner (§4.5): executes one
//! `ExecutionPlan` layer at a time behind a hard barrier, dispatching jobs
//! to a `std::thread` worker pool sized by `RunOptions::concurrency`
//! (mirroring the teacher's `engine_parallel.rs` wave-based model), resolving
//! inputs from the event logs, invoking the provider, persisting blobs and
//! artifact events, and emitting progress.
//!
//! ## Modules
//!
//! - [`resolve`] — Per-job input resolution from the event logs
//! - [`job`] — The per-job produce/persist/progress protocol
//! - [`layer`] — One layer's bounded worker pool
//! - [`runner`] — `execute_plan`, the single entry point
//! - [`cancel`] — Cooperative cancellation signal
//! - [`error`] — Runner-facing error taxonomy

pub mod cancel;
pub mod error;
pub mod job;
pub mod layer;
pub mod resolve;
pub mod runner;

pub use cancel::CancellationToken;
pub use error::{RunnerError, RunnerResult};
pub use runner::{execute_plan, RunOptions, RunResult, RunStatus};
