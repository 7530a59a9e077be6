//! Database access helpers

pub mod import_jobs;
