//! Import job bookkeeping
//!
//! One `import_jobs` row per run. The worker's progress sink keeps
//! `status`/`current_rows`/`total_rows` fresh while the run executes; the
//! status endpoint polls the same row.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Persisted view of one import run.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportJobRow {
    pub id: Uuid,
    pub source_path: String,
    pub status: String,
    pub current_rows: i64,
    pub total_rows: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Register a queued run before the job is pushed to the queue, so a status
/// poll between enqueue and pickup sees `pending` instead of nothing.
pub async fn create(pool: &PgPool, job_id: Uuid, source_path: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO import_jobs (id, source_path, status)
        VALUES ($1, $2, 'pending')
        "#,
    )
    .bind(job_id)
    .bind(source_path)
    .execute(pool)
    .await
    .context("Failed to create import job row")?;

    Ok(())
}

/// Record the human-readable failure summary for a run that terminated as
/// failed. The status itself is already written by the progress sink.
pub async fn record_failure(pool: &PgPool, job_id: Uuid, error: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE import_jobs
        SET status = 'failed', error = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(error)
    .bind(job_id)
    .execute(pool)
    .await
    .context("Failed to record import job failure")?;

    Ok(())
}

/// Fetch one job row by id.
pub async fn fetch(pool: &PgPool, job_id: Uuid) -> Result<Option<ImportJobRow>, sqlx::Error> {
    sqlx::query_as::<_, ImportJobRow>(
        r#"
        SELECT id, source_path, status, current_rows, total_rows, error, created_at, updated_at
        FROM import_jobs
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await
}
