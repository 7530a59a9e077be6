//! Feature modules implementing the Skuflow API
//!
//! Each feature is organized as a vertical slice following the CQRS
//! (Command Query Responsibility Segregation) pattern, with its own
//! commands, queries, and routes.
//!
//! # Features
//!
//! - **imports**: Catalog upload, import job enqueueing, and status polling
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations (upload, enqueue)
//! - `queries/` - Read operations (status)
//! - `routes.rs` - HTTP route definitions

pub mod imports;

use apalis_postgres::PostgresStorage;
use axum::Router;

use crate::config::ImportConfig;
use crate::ingest::CsvImportJob;

/// Shared state for all feature routes
///
/// Contains the database connection pool, the job queue backend, and the
/// import settings that route handlers need.
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: sqlx::PgPool,
    /// Job queue backend used to enqueue import jobs
    pub queue: PostgresStorage<CsvImportJob>,
    /// Import settings (batch size, cleanup policy, upload directory)
    pub import: ImportConfig,
}

/// Creates the main API router with all feature routes mounted
///
/// Each feature is mounted under its own path prefix:
/// - `/imports` - Catalog upload and import status
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest("/imports", imports::imports_routes().with_state(state.clone()))
}
