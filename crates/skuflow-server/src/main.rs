//! Skuflow Server - Main entry point

use anyhow::Result;
use apalis_postgres::PostgresStorage;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use skuflow_common::logging::{init_logging, LogConfig};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, time::Duration};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tracing::info;

use skuflow_server::{config::Config, features, ingest::ImportScheduler, middleware};

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    db: sqlx::PgPool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::new()
        .with_file_prefix("skuflow-server")
        .with_filter_directives("skuflow_server=debug,tower_http=debug,axum=trace,sqlx=info");

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting Skuflow Server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    info!("Database connection pool established");

    // The queue broker may live on a separate Postgres instance
    let queue_pool = if config.queue.database_url == config.database.url {
        db_pool.clone()
    } else {
        PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.queue.database_url)
            .await?
    };

    // Run migrations
    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    // Apalis manages its own schema on the queue database
    PostgresStorage::setup(&queue_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to set up queue storage: {}", e))?;

    // Start the import worker pool
    let scheduler = ImportScheduler::new(db_pool.clone(), queue_pool, &config.import);
    let queue = scheduler.queue();
    let shutdown = scheduler.shutdown_token();
    let _worker_handle = scheduler.start();
    info!("Import worker pool started");

    // Create application state
    let state = AppState {
        db: db_pool.clone(),
    };

    let feature_state = features::FeatureState {
        db: db_pool,
        queue,
        import: config.import.clone(),
    };

    // Build the application router
    let app = create_router(state, feature_state, &config);

    // Create socket address
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs, shutdown))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState, feature_state: features::FeatureState, config: &Config) -> Router {
    let feature_routes = features::router(feature_state);

    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
        .merge(feature_routes)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Result<Response, StatusCode> {
    // Check database connectivity
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}

/// Graceful shutdown signal handler
///
/// Cancels the worker shutdown token so in-flight imports terminate before
/// the process exits.
async fn shutdown_signal(timeout_secs: u64, worker_shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    worker_shutdown.cancel();

    // Give ongoing requests and imports time to wind down
    let grace = grace_period(timeout_secs);
    info!("Waiting up to {} seconds for connections to close", grace.as_secs());
    tokio::time::sleep(grace).await;
}

/// How long shutdown waits for in-flight work, as configured.
fn grace_period(timeout_secs: u64) -> Duration {
    Duration::from_secs(timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grace_period_honors_configured_timeout() {
        assert_eq!(grace_period(30), Duration::from_secs(30));
        assert_eq!(grace_period(0), Duration::from_secs(0));
    }
}
