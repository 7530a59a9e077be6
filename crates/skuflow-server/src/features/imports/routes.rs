//! Import routes
//!
//! `POST /imports` uploads a catalog and enqueues the import job;
//! `GET /imports/:job_id` polls its status.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::commands::{enqueue::handle as handle_enqueue, EnqueueImportCommand, EnqueueImportError};
use super::queries::{get_status::handle as handle_get_status, GetImportStatusError, GetImportStatusQuery};
use crate::features::FeatureState;

/// Create import routes
pub fn imports_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", post(upload_import))
        .route("/:job_id", get(import_status))
}

/// Accept a catalog upload and start processing in the background
///
/// POST /imports (multipart, `file` field)
#[tracing::instrument(skip(state, multipart))]
async fn upload_import(
    State(state): State<FeatureState>,
    mut multipart: Multipart,
) -> Result<Response, ImportApiError> {
    let mut filename: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportApiError::Multipart(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ImportApiError::Multipart(format!("Failed to read file bytes: {}", e)))?;
            content = Some(data.to_vec());
        }
    }

    let command = EnqueueImportCommand {
        filename: filename
            .ok_or_else(|| ImportApiError::Multipart("No file field found in multipart data".to_string()))?,
        content: content.unwrap_or_default(),
    };

    let response = handle_enqueue(
        state.db.clone(),
        state.queue.clone(),
        state.import.upload_dir.clone(),
        command,
    )
    .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "File uploaded successfully. Processing started.",
            "job_id": response.job_id,
        })),
    )
        .into_response())
}

/// Poll the status of an import job
///
/// GET /imports/:job_id
async fn import_status(
    State(state): State<FeatureState>,
    Path(job_id): Path<String>,
) -> Result<Response, ImportApiError> {
    let query = GetImportStatusQuery { job_id };

    let status = handle_get_status(state.db.clone(), query).await?;

    Ok((StatusCode::OK, Json(json!(status))).into_response())
}

#[derive(Debug)]
enum ImportApiError {
    Multipart(String),
    Enqueue(EnqueueImportError),
    Status(GetImportStatusError),
}

impl From<EnqueueImportError> for ImportApiError {
    fn from(err: EnqueueImportError) -> Self {
        Self::Enqueue(err)
    }
}

impl From<GetImportStatusError> for ImportApiError {
    fn from(err: GetImportStatusError) -> Self {
        Self::Status(err)
    }
}

impl IntoResponse for ImportApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ImportApiError::Multipart(message) => (StatusCode::BAD_REQUEST, message),
            ImportApiError::Enqueue(err) => match err {
                EnqueueImportError::InvalidFormat | EnqueueImportError::EmptyFile => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                },
                EnqueueImportError::Io(_) | EnqueueImportError::Queue(_) => {
                    tracing::error!("Failed to accept upload: {:?}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Could not accept upload".to_string())
                },
            },
            ImportApiError::Status(err) => match err {
                GetImportStatusError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                GetImportStatusError::InvalidState(_) | GetImportStatusError::Database(_) => {
                    tracing::error!("Failed to load import status: {:?}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Could not load import status".to_string())
                },
            },
        };

        (status, Json(json!({ "error": { "message": message } }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imports_routes_exist() {
        // Test that routes can be built
        let _router = imports_routes();
    }

    #[test]
    fn test_missing_job_maps_to_not_found() {
        let response =
            ImportApiError::Status(GetImportStatusError::NotFound).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_corrupt_job_state_maps_to_internal_error() {
        let response = ImportApiError::Status(GetImportStatusError::InvalidState(
            "garbled".to_string(),
        ))
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
