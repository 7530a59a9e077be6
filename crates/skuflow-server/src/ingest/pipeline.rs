//! Ingestion orchestrator
//!
//! Drives one end-to-end import run: count pass, stream pass through
//! normalizer → accumulator → writer inside a single transaction, progress
//! after every flush, commit, cleanup, and webhook notification on success.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::batch::{dedup_by_sku, BatchAccumulator};
use super::cleanup::{apply_cleanup, CleanupPolicy};
use super::normalizer::{CleanRecord, RecordNormalizer};
use super::progress::{ProgressReporter, ProgressSink};
use super::webhooks::{CompletionPayload, NotificationDispatcher};
use super::writer::upsert_batch;

/// Terminal outcome of one import run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { processed: u64 },
    Failed { error: String },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// One-run ingestion pipeline over a CSV source artifact.
///
/// All stream-read, normalize, accumulate, and flush steps run strictly
/// sequentially on the calling task; concurrency across runs comes from the
/// job queue's worker pool, each run owning its own source and transaction.
pub struct ImportPipeline {
    pool: PgPool,
    batch_size: usize,
    cleanup_policy: CleanupPolicy,
    dispatcher: NotificationDispatcher,
}

impl ImportPipeline {
    pub fn new(pool: PgPool, batch_size: usize, cleanup_policy: CleanupPolicy) -> Self {
        let dispatcher = NotificationDispatcher::new(pool.clone());
        Self {
            pool,
            batch_size,
            cleanup_policy,
            dispatcher,
        }
    }

    /// Execute one run against `source` and produce its terminal outcome.
    ///
    /// Any error while streaming, flushing, or committing rolls the
    /// transaction back and terminates the run as `Failed`, skipping
    /// notification. Cleanup runs exactly once in every terminal state, after
    /// all source file handles are closed. Cancellation through `cancel`
    /// terminates as `Failed` and still runs cleanup.
    pub async fn run<S: ProgressSink>(
        &self,
        source: &Path,
        reporter: &mut ProgressReporter<S>,
        cancel: CancellationToken,
    ) -> RunOutcome {
        info!(source = %source.display(), "Import run started");

        let outcome = match self.execute(source, reporter, &cancel).await {
            Ok(processed) => {
                reporter.completed().await;
                info!(processed, "Import run completed");
                RunOutcome::Completed { processed }
            },
            Err(e) => {
                // The transaction was dropped inside execute(), rolling back
                // every flushed batch of this run.
                error!(error = %format!("{:#}", e), "Import run failed");
                reporter.failed().await;
                RunOutcome::Failed {
                    error: format!("{:#}", e),
                }
            },
        };

        apply_cleanup(self.cleanup_policy, source, outcome.is_completed());

        if let RunOutcome::Completed { processed } = outcome {
            let payload =
                CompletionPayload::import_completed(source.display().to_string(), processed);
            self.dispatcher.notify_completion(payload).await;
        }

        outcome
    }

    /// The fallible part of the run; returns the processed row count.
    ///
    /// File-bound work (the count pass and the CSV stream) runs on blocking
    /// threads so a large catalog never stalls the executor; this task owns
    /// the transaction and consumes batches as the reader produces them.
    async fn execute<S: ProgressSink>(
        &self,
        source: &Path,
        reporter: &mut ProgressReporter<S>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        reporter.counting().await;
        let total = {
            let source = source.to_path_buf();
            tokio::task::spawn_blocking(move || count_candidate_rows(&source))
                .await
                .context("Count task terminated abnormally")??
        };
        reporter.start(total).await;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin import transaction")?;

        let (batch_tx, mut batch_rx) = mpsc::channel::<Vec<CleanRecord>>(2);
        let reader_task =
            spawn_reader(source.to_path_buf(), self.batch_size, cancel.clone(), batch_tx);

        let mut processed: u64 = 0;

        while let Some(batch) = batch_rx.recv().await {
            let rows = batch.len() as u64;
            upsert_batch(&mut tx, &dedup_by_sku(batch)).await?;
            processed += rows;
            reporter.advance(rows).await;
        }

        // The reader (and its file handle) is done once the channel closes;
        // surface any stream error before committing, and before any cleanup
        // decision can touch the artifact.
        reader_task
            .await
            .context("Reader task terminated abnormally")??;

        tx.commit()
            .await
            .context("Failed to commit import transaction")?;

        Ok(processed)
    }
}

/// Stream the source on a blocking thread, sending each full batch through
/// the channel. The residual partial batch is sent at end-of-stream.
///
/// A send failure means the consumer stopped on its own error; that error
/// wins, so the reader just stops. Cancellation aborts the stream with an
/// error.
fn spawn_reader(
    source: PathBuf,
    batch_size: usize,
    cancel: CancellationToken,
    batch_tx: mpsc::Sender<Vec<CleanRecord>>,
) -> JoinHandle<Result<()>> {
    tokio::task::spawn_blocking(move || {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&source)
            .with_context(|| format!("Failed to open source artifact {}", source.display()))?;

        let headers = reader
            .headers()
            .context("Failed to read source header row")?
            .clone();
        let normalizer = RecordNormalizer::from_headers(&headers);

        let mut accumulator = BatchAccumulator::new(batch_size);

        for record in reader.records() {
            if cancel.is_cancelled() {
                anyhow::bail!("Import cancelled");
            }

            let record = record.context("Failed to read source row")?;

            let Some(clean) = normalizer.normalize(&record) else {
                continue;
            };

            if let Some(batch) = accumulator.push(clean) {
                if batch_tx.blocking_send(batch).is_err() {
                    return Ok(());
                }
            }
        }

        if let Some(batch) = accumulator.finish() {
            let _ = batch_tx.blocking_send(batch);
        }

        Ok(())
    })
}

/// Count candidate rows for the progress denominator: total lines minus the
/// header line.
///
/// A trailing blank line counts as a candidate row, so an artifact with
/// trailing blanks over-counts by that many lines. This mirrors the source
/// behavior being modeled and is intentionally not corrected; the percentage
/// can undershoot 100 for such artifacts, never the row counter itself.
pub fn count_candidate_rows(source: &Path) -> Result<u64> {
    let file = File::open(source)
        .with_context(|| format!("Failed to open source artifact {}", source.display()))?;

    let lines = BufReader::new(file).lines();
    let mut count: u64 = 0;
    for line in lines {
        line.context("Failed to read source line")?;
        count += 1;
    }

    Ok(count.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_source(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_count_excludes_header() {
        let (_dir, path) = write_source("sku,name\na,Widget\nb,Gadget\n");
        assert_eq!(count_candidate_rows(&path).unwrap(), 2);
    }

    #[test]
    fn test_count_header_only() {
        let (_dir, path) = write_source("sku,name\n");
        assert_eq!(count_candidate_rows(&path).unwrap(), 0);
    }

    #[test]
    fn test_count_empty_file_saturates_at_zero() {
        let (_dir, path) = write_source("");
        assert_eq!(count_candidate_rows(&path).unwrap(), 0);
    }

    #[test]
    fn test_count_includes_trailing_blank_lines() {
        // Documented quirk: blank lines inflate the denominator.
        let (_dir, path) = write_source("sku,name\na,Widget\n\n\n");
        assert_eq!(count_candidate_rows(&path).unwrap(), 3);
    }

    #[test]
    fn test_count_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        assert!(count_candidate_rows(&path).is_err());
    }

    #[tokio::test]
    async fn test_reader_streams_batches_off_the_async_task() {
        let (_dir, path) = write_source("sku,name\na,A\nb,B\nc,C\n");

        let (tx, mut rx) = mpsc::channel(2);
        let task = spawn_reader(path, 2, CancellationToken::new(), tx);

        let mut batches = Vec::new();
        while let Some(batch) = rx.recv().await {
            batches.push(batch);
        }
        task.await.unwrap().unwrap();

        // One full batch plus the residual, in stream order
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0][0].sku, "a");
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[1][0].sku, "c");
    }

    #[tokio::test]
    async fn test_reader_skips_rows_failing_normalization() {
        let (_dir, path) = write_source("sku,name\n,NoSku\nb,B\n");

        let (tx, mut rx) = mpsc::channel(2);
        let task = spawn_reader(path, 10, CancellationToken::new(), tx);

        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].sku, "b");
        assert!(rx.recv().await.is_none());
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_reader_aborts_on_cancellation() {
        let (_dir, path) = write_source("sku,name\na,A\nb,B\n");

        let cancel = CancellationToken::new();
        cancel.cancel();

        let (tx, mut rx) = mpsc::channel(2);
        let task = spawn_reader(path, 1, cancel, tx);

        assert!(rx.recv().await.is_none());
        assert!(task.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_reader_stops_quietly_when_consumer_drops() {
        let (_dir, path) = write_source("sku,name\na,A\nb,B\nc,C\nd,D\n");

        let (tx, mut rx) = mpsc::channel(1);
        let task = spawn_reader(path, 1, CancellationToken::new(), tx);

        // Take one batch, then hang up mid-stream.
        assert!(rx.recv().await.is_some());
        drop(rx);

        task.await.unwrap().unwrap();
    }
}
