//! Catalog ingestion pipeline
//!
//! Everything one import run is made of, leaf-first:
//!
//! - [`normalizer`] — raw CSV row → cleaned candidate, or silently dropped
//! - [`batch`] — fixed-size accumulation and in-batch SKU deduplication
//! - [`writer`] — one multi-row upsert per batch inside the run transaction
//! - [`progress`] — monotone progress snapshots behind a [`progress::ProgressSink`]
//! - [`cleanup`] — post-run source artifact policy
//! - [`webhooks`] — best-effort completion fan-out to registered listeners
//! - [`pipeline`] — the orchestrator driving one end-to-end run
//! - [`jobs`] / [`scheduler`] — queue payloads and the apalis worker pool

pub mod batch;
pub mod cleanup;
pub mod jobs;
pub mod normalizer;
pub mod pipeline;
pub mod progress;
pub mod scheduler;
pub mod webhooks;
pub mod writer;

pub use cleanup::CleanupPolicy;
pub use jobs::CsvImportJob;
pub use normalizer::{CleanRecord, RecordNormalizer};
pub use pipeline::{ImportPipeline, RunOutcome};
pub use progress::{ImportState, ProgressReporter, ProgressSink, ProgressSnapshot};
pub use scheduler::{enqueue_import, ImportScheduler};
