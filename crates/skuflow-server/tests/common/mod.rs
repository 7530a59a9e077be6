//! Common test utilities for Skuflow integration tests using testcontainers
//!
//! Provides a PostgreSQL container with migrations pre-applied so tests get
//! an isolated database each, without manual setup.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestPostgres;
//!
//! #[tokio::test]
//! async fn test_with_postgres() {
//!     let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
//!     let pool = pg.pool();
//!
//!     sqlx::query("SELECT 1").execute(pool).await.expect("Query failed");
//! }
//! ```

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::{debug, info};

/// PostgreSQL test container wrapper
///
/// Provides a PostgreSQL container with migrations pre-applied, ready for
/// testing.
pub struct TestPostgres {
    // Held for its Drop; stopping the container tears down the database.
    #[allow(dead_code)]
    container: ContainerAsync<Postgres>,
    pool: PgPool,
    connection_string: String,
}

impl TestPostgres {
    /// Start a new PostgreSQL container with migrations applied
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        debug!("PostgreSQL connection: {}", connection_string);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!("Running database migrations...");
        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
        info!("Migrations completed successfully");

        Ok(Self {
            container,
            pool,
            connection_string,
        })
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a clone of the database pool
    #[allow(dead_code)]
    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }

    /// Get the connection string
    #[allow(dead_code)]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

/// Initialize tracing for tests
///
/// Safe to call multiple times; only the first call installs the subscriber.
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,skuflow_server=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}
