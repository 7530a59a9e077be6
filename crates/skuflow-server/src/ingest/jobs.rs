//! Job definitions for catalog imports
//!
//! Defines the job payload carried through the apalis job queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// CSV import job payload
///
/// One job drives exactly one import run against one source artifact. The
/// `job_id` matches the `import_jobs` row the status endpoint polls, so it
/// stays stable regardless of how the queue backend identifies tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvImportJob {
    /// Identifier shared with the `import_jobs` status row
    pub job_id: Uuid,
    /// Path to the uploaded source artifact
    pub source_path: PathBuf,
    /// Timestamp when the job was created
    pub created_at: DateTime<Utc>,
}

impl CsvImportJob {
    pub fn new(job_id: Uuid, source_path: PathBuf) -> Self {
        Self {
            job_id,
            source_path,
            created_at: Utc::now(),
        }
    }
}
