//! Skuflow Server Library
//!
//! HTTP server for ingesting product catalogs into PostgreSQL.
//!
//! # Overview
//!
//! The Skuflow server accepts catalog CSV uploads, processes them in the
//! background, and exposes polling endpoints for import progress:
//!
//! - **API Endpoints**: upload a catalog, poll an import job
//! - **Ingestion Pipeline**: chunked streaming, row normalization,
//!   batch deduplication, and atomic batch upserts into PostgreSQL
//! - **Job Queue**: Postgres-backed background workers via apalis
//! - **Webhooks**: best-effort completion notifications
//! - **Configuration**: environment-based configuration management
//!
//! # Architecture
//!
//! The HTTP surface follows a **CQRS (Command Query Responsibility
//! Segregation)** layout: commands accept uploads and enqueue work, queries
//! read job state. The ingestion pipeline itself lives in [`ingest`] and is
//! driven by queue workers, never by request handlers.
//!
//! ## Framework Stack
//!
//! - **Axum**: web framework (multipart uploads, JSON responses)
//! - **SQLx**: PostgreSQL access and migrations
//! - **Apalis**: Postgres-backed job queue
//!
//! # Example
//!
//! ```no_run
//! use skuflow_server::config::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     println!("batch size: {}", config.import.batch_size);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod features;
pub mod ingest;
pub mod middleware;
