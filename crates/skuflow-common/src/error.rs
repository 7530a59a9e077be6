//! Error types for Skuflow

use thiserror::Error;

/// Result type alias for Skuflow operations
pub type Result<T> = std::result::Result<T, SkuflowError>;

/// Main error type for Skuflow
#[derive(Error, Debug)]
pub enum SkuflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
