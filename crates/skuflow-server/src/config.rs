//! Configuration management

use serde::{Deserialize, Serialize};

use crate::ingest::CleanupPolicy;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default directory for uploaded source artifacts.
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub import: ImportConfig,
    pub cors: CorsConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Job queue broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Connection string of the Postgres instance backing the job queue.
    /// Defaults to the main database.
    pub database_url: String,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; empty or `*` means any origin
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Import pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Rows per flushed batch; must be positive
    pub batch_size: usize,
    /// What happens to the source artifact once a run terminates
    pub cleanup_policy: CleanupPolicy,
    /// Where uploaded source artifacts are written before processing
    pub upload_dir: std::path::PathBuf,
}

impl Config {
    /// Load configuration from environment and defaults
    ///
    /// Fails fast: a missing required variable, a non-positive batch size, or
    /// an invalid cleanup policy aborts startup before any run can be
    /// accepted.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set in environment"))?;

        let batch_size_raw = std::env::var("IMPORT_BATCH_SIZE")
            .map_err(|_| anyhow::anyhow!("IMPORT_BATCH_SIZE is not set in environment"))?;
        let batch_size: usize = batch_size_raw
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid IMPORT_BATCH_SIZE: {}", batch_size_raw))?;

        let cleanup_policy = CleanupPolicy::parse(
            &std::env::var("CSV_CLEANUP_POLICY").unwrap_or_else(|_| "always".to_string()),
        )?;

        let config = Config {
            server: ServerConfig {
                host: std::env::var("SKUFLOW_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("SKUFLOW_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: std::env::var("SKUFLOW_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
                idle_timeout_secs: std::env::var("DATABASE_IDLE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
                url: database_url.clone(),
            },
            queue: QueueConfig {
                database_url: std::env::var("QUEUE_DATABASE_URL").unwrap_or(database_url),
            },
            import: ImportConfig {
                batch_size,
                cleanup_policy,
                upload_dir: std::env::var("IMPORT_UPLOAD_DIR")
                    .unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_string())
                    .into(),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
                    .unwrap_or_default(),
                allow_credentials: std::env::var("CORS_ALLOW_CREDENTIALS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.queue.database_url.is_empty() {
            anyhow::bail!("Queue database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.import.batch_size == 0 {
            anyhow::bail!("IMPORT_BATCH_SIZE must be a positive integer");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/skuflow".to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            queue: QueueConfig {
                database_url: "postgresql://localhost/skuflow".to_string(),
            },
            import: ImportConfig {
                batch_size: 500,
                cleanup_policy: CleanupPolicy::Always,
                upload_dir: DEFAULT_UPLOAD_DIR.into(),
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
                allow_credentials: false,
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = valid_config();
        config.import.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_database_url_rejected() {
        let mut config = valid_config();
        config.database.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_connections_cannot_exceed_max() {
        let mut config = valid_config();
        config.database.min_connections = config.database.max_connections + 1;
        assert!(config.validate().is_err());
    }
}
