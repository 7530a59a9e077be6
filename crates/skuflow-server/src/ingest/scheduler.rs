//! Job scheduler
//!
//! Sets up the apalis job queue with PostgreSQL storage and runs the import
//! worker pool. Each worker task executes one run at a time; concurrent runs
//! come from independent workers, never from parallelism inside a run.

use anyhow::{Context, Result};
use apalis::prelude::*;
use apalis_postgres::PostgresStorage;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use super::cleanup::CleanupPolicy;
use super::jobs::CsvImportJob;
use super::pipeline::{ImportPipeline, RunOutcome};
use super::progress::{PgProgressSink, ProgressReporter};
use crate::config::ImportConfig;
use crate::db;

/// Everything one worker invocation needs to execute a run.
#[derive(Clone)]
pub struct WorkerContext {
    pub db: PgPool,
    pub batch_size: usize,
    pub cleanup_policy: CleanupPolicy,
    /// Cancelled on shutdown; in-flight runs terminate as failed and still
    /// run their cleanup policy.
    pub shutdown: CancellationToken,
}

/// Import job scheduler
pub struct ImportScheduler {
    queue_db: PgPool,
    ctx: WorkerContext,
}

impl ImportScheduler {
    pub fn new(db: PgPool, queue_db: PgPool, import: &ImportConfig) -> Self {
        Self {
            queue_db,
            ctx: WorkerContext {
                db,
                batch_size: import.batch_size,
                cleanup_policy: import.cleanup_policy,
                shutdown: CancellationToken::new(),
            },
        }
    }

    /// Token to trigger cooperative shutdown of in-flight runs.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.ctx.shutdown.clone()
    }

    /// Handle used by the HTTP layer to enqueue jobs into the same backend.
    pub fn queue(&self) -> PostgresStorage<CsvImportJob> {
        PostgresStorage::new(&self.queue_db)
    }

    /// Start the worker pool in a background task.
    pub fn start(self) -> JoinHandle<()> {
        let storage = PostgresStorage::new(&self.queue_db);
        let ctx = self.ctx;

        tokio::spawn(async move {
            info!("Import worker started");
            if let Err(e) = Monitor::new()
                .register(move |_index| {
                    let ctx = ctx.clone();
                    WorkerBuilder::new("skuflow-import-worker")
                        .backend(storage.clone())
                        .build(move |job: CsvImportJob| {
                            let ctx = ctx.clone();
                            async move { process_import_job(job, ctx).await }
                        })
                })
                .run()
                .await
            {
                error!("Import worker error: {:?}", e);
            }
            info!("Import worker stopped");
        })
    }
}

/// Register the job row and push the payload onto the queue.
///
/// Returns the job identifier the status endpoint accepts.
pub async fn enqueue_import(
    queue: &mut PostgresStorage<CsvImportJob>,
    pool: &PgPool,
    source_path: std::path::PathBuf,
) -> Result<Uuid> {
    let job_id = Uuid::new_v4();

    db::import_jobs::create(pool, job_id, &source_path.display().to_string()).await?;

    queue
        .push(CsvImportJob::new(job_id, source_path))
        .await
        .context("Failed to enqueue import job")?;

    info!(job_id = %job_id, "Import job enqueued");

    Ok(job_id)
}

/// Execute one import job on a worker task.
///
/// Always returns `Ok`: the run's terminal state lives in `import_jobs`, and
/// a failed run must not be retried by the queue (re-running a failed import
/// is an operator decision, not an automatic one).
async fn process_import_job(job: CsvImportJob, ctx: WorkerContext) -> Result<()> {
    info!(job_id = %job.job_id, source = %job.source_path.display(), "Processing import job");

    let sink = PgProgressSink::new(ctx.db.clone(), job.job_id);
    let mut reporter = ProgressReporter::new(sink);

    let pipeline = ImportPipeline::new(ctx.db.clone(), ctx.batch_size, ctx.cleanup_policy);

    let outcome = pipeline
        .run(&job.source_path, &mut reporter, ctx.shutdown.child_token())
        .await;

    if let RunOutcome::Failed { error } = &outcome {
        if let Err(e) = db::import_jobs::record_failure(&ctx.db, job.job_id, error).await {
            error!(job_id = %job.job_id, error = %e, "Failed to record job failure");
        }
    }

    Ok(())
}
