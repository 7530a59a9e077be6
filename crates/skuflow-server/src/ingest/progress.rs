//! Progress reporter
//!
//! Maintains a monotonically advancing progress snapshot for one import run
//! and publishes it through a [`ProgressSink`]. The pipeline is the single
//! writer; an external status poller reads whatever the sink persisted, so
//! consumers see eventually-consistent but never-decreasing values.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

/// Lifecycle of one import run, as observed by a status poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    /// Queued, no worker has picked it up yet
    Pending,
    /// Worker is computing the progress denominator
    Counting,
    /// Total known, rows streaming through the pipeline
    Running,
    Completed,
    Failed,
}

impl ImportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportState::Pending => "pending",
            ImportState::Counting => "counting",
            ImportState::Running => "running",
            ImportState::Completed => "completed",
            ImportState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportState::Completed | ImportState::Failed)
    }
}

impl std::str::FromStr for ImportState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ImportState::Pending),
            "counting" => Ok(ImportState::Counting),
            "running" => Ok(ImportState::Running),
            "completed" => Ok(ImportState::Completed),
            "failed" => Ok(ImportState::Failed),
            other => Err(anyhow::anyhow!("Unknown import state: {}", other)),
        }
    }
}

/// Point-in-time view of an import run's progress.
///
/// `total` is fixed once the counting pass finishes; 0 means unknown and the
/// percentage reads as 0 rather than dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub current: u64,
    pub total: u64,
    pub state: ImportState,
}

impl ProgressSnapshot {
    /// Completion percentage rounded to two decimals; 0 when the total is
    /// unknown.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let raw = (self.current as f64 / self.total as f64) * 100.0;
        (raw * 100.0).round() / 100.0
    }
}

/// Capability interface for publishing progress snapshots.
///
/// The pipeline core depends only on this trait; the production
/// implementation persists snapshots into `import_jobs` for the status
/// endpoint to poll, and tests substitute an in-memory sink.
pub trait ProgressSink: Send + Sync {
    fn report(
        &self,
        snapshot: &ProgressSnapshot,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// Single-writer progress state machine for one run.
///
/// Transitions: `Pending → Counting → Running → Completed | Failed`.
/// `current` only ever increases. Sink failures are logged and swallowed;
/// losing a progress update must not fail an otherwise healthy run.
pub struct ProgressReporter<S> {
    snapshot: ProgressSnapshot,
    sink: S,
}

impl<S: ProgressSink> ProgressReporter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            snapshot: ProgressSnapshot {
                current: 0,
                total: 0,
                state: ImportState::Pending,
            },
            sink,
        }
    }

    /// Enter the counting phase (total not yet known)
    pub async fn counting(&mut self) {
        self.snapshot.state = ImportState::Counting;
        self.publish().await;
    }

    /// Fix the denominator and enter the running phase
    pub async fn start(&mut self, total: u64) {
        self.snapshot.total = total;
        self.snapshot.state = ImportState::Running;
        self.publish().await;
    }

    /// Advance the processed-row counter; never decreases
    pub async fn advance(&mut self, delta: u64) {
        self.snapshot.current = self.snapshot.current.saturating_add(delta);
        self.publish().await;
    }

    /// Terminal success
    pub async fn completed(&mut self) {
        self.snapshot.state = ImportState::Completed;
        self.publish().await;
    }

    /// Terminal failure; keeps whatever partial count had accumulated
    pub async fn failed(&mut self) {
        self.snapshot.state = ImportState::Failed;
        self.publish().await;
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot
    }

    async fn publish(&self) {
        if let Err(e) = self.sink.report(&self.snapshot).await {
            warn!(error = %e, "Failed to publish progress snapshot");
        }
    }
}

/// Production sink: persists snapshots into the `import_jobs` row the status
/// endpoint reads.
#[derive(Clone)]
pub struct PgProgressSink {
    pool: PgPool,
    job_id: Uuid,
}

impl PgProgressSink {
    pub fn new(pool: PgPool, job_id: Uuid) -> Self {
        Self { pool, job_id }
    }
}

impl ProgressSink for PgProgressSink {
    async fn report(&self, snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = $1,
                current_rows = $2,
                total_rows = $3,
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(snapshot.state.as_str())
        .bind(snapshot.current as i64)
        .bind(snapshot.total as i64)
        .bind(self.job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Sink that drops every snapshot; for callers that do not track progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    async fn report(&self, _snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
        Ok(())
    }
}
