//! Enqueue import command
//!
//! Accepts an uploaded catalog file, persists it to the upload directory, and
//! registers + enqueues the import job.

use apalis_postgres::PostgresStorage;
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::path::PathBuf;
use uuid::Uuid;

use crate::ingest::{enqueue_import, CsvImportJob};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueImportCommand {
    pub filename: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueImportResponse {
    pub job_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum EnqueueImportError {
    #[error("Invalid file format. Only .csv files are supported")]
    InvalidFormat,
    #[error("File is empty")]
    EmptyFile,
    #[error("Could not save file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not enqueue import: {0}")]
    Queue(#[from] anyhow::Error),
}

impl Request<Result<EnqueueImportResponse, EnqueueImportError>> for EnqueueImportCommand {}

impl EnqueueImportCommand {
    pub fn validate(&self) -> Result<(), EnqueueImportError> {
        if !self.filename.to_lowercase().ends_with(".csv") {
            return Err(EnqueueImportError::InvalidFormat);
        }
        if self.content.is_empty() {
            return Err(EnqueueImportError::EmptyFile);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, queue, command), fields(filename = %command.filename))]
pub async fn handle(
    pool: PgPool,
    mut queue: PostgresStorage<CsvImportJob>,
    upload_dir: PathBuf,
    command: EnqueueImportCommand,
) -> Result<EnqueueImportResponse, EnqueueImportError> {
    command.validate()?;

    let source_path = persist_upload(&upload_dir, &command.filename, &command.content).await?;

    match enqueue_import(&mut queue, &pool, source_path.clone()).await {
        Ok(job_id) => {
            tracing::info!(job_id = %job_id, path = %source_path.display(), "Upload accepted");
            Ok(EnqueueImportResponse { job_id })
        },
        Err(e) => {
            // The job never made it onto the queue; don't leave the artifact
            // behind.
            let _ = tokio::fs::remove_file(&source_path).await;
            Err(EnqueueImportError::Queue(e))
        },
    }
}

/// Write the uploaded bytes into the upload directory without tying up the
/// executor thread.
///
/// A fresh prefix keeps concurrent uploads of the same filename apart.
async fn persist_upload(
    upload_dir: &std::path::Path,
    filename: &str,
    content: &[u8],
) -> Result<PathBuf, std::io::Error> {
    tokio::fs::create_dir_all(upload_dir).await?;

    let source_path = upload_dir.join(format!("{}_{}", Uuid::new_v4(), sanitize(filename)));
    tokio::fs::write(&source_path, content).await?;

    Ok(source_path)
}

/// Keep only path-safe characters from a client-supplied filename.
fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
