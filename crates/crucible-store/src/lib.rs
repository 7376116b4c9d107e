//! # crucible-store
//!
//! Persistence for the crucible media build engine: a content-addressed
//! blob store, the two append-only event logs (`inputs.log`,
//! `artefacts.log`), and manifest/plan persistence with the
//! `current.json` optimistic-concurrency pointer.
//!
//! ## Modules
//!
//! - [`blobstore`] — `BlobStore` trait plus local-filesystem and in-memory backends
//! - [`eventlog`] — Generic append-only JSONL log, plus latest-event-wins compaction
//! - [`manifest_store`] — Manifest file persistence and the `current.json` pointer
//! - [`paths`] — The on-disk layout for one movie
//! - [`store`] — `MovieStore`: the facade other crates depend on
//! - [`error`] — Store-layer error taxonomy

pub mod blobstore;
pub mod error;
pub mod eventlog;
pub mod manifest_store;
pub mod paths;
pub mod store;

pub use blobstore::{BlobStore, InMemoryBlobStore, LocalBlobStore};
pub use error::{StoreError, StoreResult};
pub use eventlog::{compact_latest_wins, EventLog};
pub use store::{FileMovieStore, InMemoryMovieStore, MovieStore};
