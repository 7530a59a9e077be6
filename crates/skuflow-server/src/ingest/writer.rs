//! Upsert writer
//!
//! Persists one deduplicated batch of products with insert-or-update
//! semantics, as a single multi-row statement inside the run's transaction.

use anyhow::{Context, Result};
use sqlx::{Postgres, Transaction};
use tracing::debug;

use super::normalizer::CleanRecord;

/// Upsert a batch of products keyed by unique `sku`.
///
/// New SKUs are inserted with `is_active = true`; existing SKUs get their
/// `name` and `description` overwritten while `sku`, `is_active`, and
/// `created_at` stay untouched. The batch must already be deduplicated by
/// SKU ([`super::batch::dedup_by_sku`]); Postgres rejects an upsert that
/// touches the same key twice in one statement.
///
/// The statement runs inside the caller's transaction, so run-level
/// atomicity (all flushed batches commit together or not at all) is owned by
/// the orchestrator.
pub async fn upsert_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch: &[CleanRecord],
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    let mut skus = Vec::with_capacity(batch.len());
    let mut names = Vec::with_capacity(batch.len());
    let mut descriptions = Vec::with_capacity(batch.len());

    for record in batch {
        skus.push(record.sku.clone());
        names.push(record.name.clone());
        descriptions.push(record.description.clone());
    }

    sqlx::query(
        r#"
        INSERT INTO products (sku, name, description, is_active)
        SELECT sku, name, description, TRUE
        FROM UNNEST($1::text[], $2::text[], $3::text[]) AS batch(sku, name, description)
        ON CONFLICT (sku) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            updated_at = NOW()
        "#,
    )
    .bind(&skus)
    .bind(&names)
    .bind(&descriptions)
    .execute(&mut **tx)
    .await
    .context("Failed to upsert product batch")?;

    debug!(batch_len = batch.len(), "Flushed product batch");

    Ok(())
}
