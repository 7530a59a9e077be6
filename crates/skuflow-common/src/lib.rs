//! Skuflow Common Library
//!
//! Shared error handling and logging initialization for the Skuflow project.
//!
//! # Overview
//!
//! This crate provides the pieces every Skuflow workspace member needs:
//!
//! - **Error Handling**: the [`SkuflowError`] type and [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by [`logging::LogConfig`]
//!
//! # Example
//!
//! ```no_run
//! use skuflow_common::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! fn main() -> skuflow_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     info!("up and running");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, SkuflowError};
