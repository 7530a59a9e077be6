//! Get import status query
//!
//! Read side of the status contract consumed by the routing layer: given a
//! job identifier, report the run's state, progress percentage, and latest
//! snapshot details. Never raises for a failed run; the failure is a summary
//! string, not a stack trace.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::ingest::{ImportState, ProgressSnapshot};

/// Query to get the status of one import job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetImportStatusQuery {
    pub job_id: String,
}

/// Latest progress snapshot, present once a worker has picked the job up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStatusDetails {
    pub processed_rows: i64,
    pub current: i64,
    pub total: i64,
}

/// Status of one import job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStatusResponse {
    pub job_id: String,
    pub state: String,
    pub progress_percent: f64,
    pub details: Option<ImportStatusDetails>,
    pub error: Option<String>,
}

/// Error type for the status query
#[derive(Debug, thiserror::Error)]
pub enum GetImportStatusError {
    #[error("Import job not found")]
    NotFound,
    #[error("Import job has invalid state '{0}'")]
    InvalidState(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ImportStatusResponse, GetImportStatusError>> for GetImportStatusQuery {}

pub async fn handle(
    pool: PgPool,
    query: GetImportStatusQuery,
) -> Result<ImportStatusResponse, GetImportStatusError> {
    let job_id = Uuid::parse_str(&query.job_id).map_err(|_| GetImportStatusError::NotFound)?;

    let row = db::import_jobs::fetch(&pool, job_id)
        .await?
        .ok_or(GetImportStatusError::NotFound)?;

    // A row that exists but carries an unrecognized status is corrupt data,
    // not a missing job.
    let state: ImportState = row
        .status
        .parse()
        .map_err(|_| GetImportStatusError::InvalidState(row.status.clone()))?;

    Ok(build_response(&query.job_id, state, &row))
}

fn build_response(
    job_id: &str,
    state: ImportState,
    row: &db::import_jobs::ImportJobRow,
) -> ImportStatusResponse {
    let snapshot = ProgressSnapshot {
        current: row.current_rows.max(0) as u64,
        total: row.total_rows.max(0) as u64,
        state,
    };

    // Counting is an internal phase; pollers see it as Running with no
    // denominator yet.
    let external_state = match state {
        ImportState::Pending => "Pending",
        ImportState::Counting | ImportState::Running => "Running",
        ImportState::Completed => "Completed",
        ImportState::Failed => "Failed",
    };

    let progress_percent = match state {
        ImportState::Completed => 100.0,
        _ => snapshot.percent(),
    };

    let details = match state {
        ImportState::Pending => None,
        _ => Some(ImportStatusDetails {
            processed_rows: row.current_rows,
            current: row.current_rows,
            total: row.total_rows,
        }),
    };

    let error = match state {
        ImportState::Failed => Some(
            row.error
                .clone()
                .unwrap_or_else(|| "Import failed".to_string()),
        ),
        _ => None,
    };

    ImportStatusResponse {
        job_id: job_id.to_string(),
        state: external_state.to_string(),
        progress_percent,
        details,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(status: &str, current: i64, total: i64, error: Option<&str>) -> db::import_jobs::ImportJobRow {
        db::import_jobs::ImportJobRow {
            id: Uuid::new_v4(),
            source_path: "/tmp/catalog.csv".to_string(),
            status: status.to_string(),
            current_rows: current,
            total_rows: total,
            error: error.map(|e| e.to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_running_reports_percent_and_details() {
        let response = build_response("j", ImportState::Running, &row("running", 1, 3, None));

        assert_eq!(response.state, "Running");
        assert_eq!(response.progress_percent, 33.33);
        let details = response.details.unwrap();
        assert_eq!(details.processed_rows, 1);
        assert_eq!(details.total, 3);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_counting_is_externally_running_with_zero_percent() {
        let response = build_response("j", ImportState::Counting, &row("counting", 0, 0, None));

        assert_eq!(response.state, "Running");
        assert_eq!(response.progress_percent, 0.0);
    }

    #[test]
    fn test_completed_reports_hundred_percent() {
        let response = build_response("j", ImportState::Completed, &row("completed", 3, 3, None));

        assert_eq!(response.state, "Completed");
        assert_eq!(response.progress_percent, 100.0);
    }

    #[test]
    fn test_failed_reports_summary_never_raises() {
        let response = build_response(
            "j",
            ImportState::Failed,
            &row("failed", 2, 5, Some("Failed to read source row")),
        );

        assert_eq!(response.state, "Failed");
        assert_eq!(response.error.as_deref(), Some("Failed to read source row"));
    }

    #[test]
    fn test_pending_has_no_details() {
        let response = build_response("j", ImportState::Pending, &row("pending", 0, 0, None));

        assert_eq!(response.state, "Pending");
        assert!(response.details.is_none());
    }
}
