//! Batch accumulator
//!
//! Groups cleaned records into fixed-size batches for flushing, and collapses
//! duplicate SKUs within a batch immediately before it is handed to the
//! writer.

use std::collections::HashMap;

use super::normalizer::CleanRecord;

/// Accumulates [`CleanRecord`]s up to a configured batch size.
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: usize,
    buffer: Vec<CleanRecord>,
}

impl BatchAccumulator {
    /// Create an accumulator; `batch_size` must be positive (enforced by
    /// configuration validation at startup).
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            buffer: Vec::with_capacity(batch_size),
        }
    }

    /// Append a record; returns a full batch ready for flushing once the
    /// configured size is reached, resetting the accumulator.
    pub fn push(&mut self, record: CleanRecord) -> Option<Vec<CleanRecord>> {
        self.buffer.push(record);

        if self.buffer.len() >= self.batch_size {
            let next = Vec::with_capacity(self.batch_size);
            Some(std::mem::replace(&mut self.buffer, next))
        } else {
            None
        }
    }

    /// Drain the residual partial batch at end-of-stream, if any.
    pub fn finish(mut self) -> Option<Vec<CleanRecord>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Collapse records sharing a SKU, keeping the occurrence that appears latest
/// within the batch: later rows override earlier ones in the same flush
/// window.
///
/// This only dedups within one batch. Duplicates that land in different
/// batches converge through the writer's ON CONFLICT clause instead; a
/// run-global dedup map would change last-writer-wins into
/// process-order-wins, so it is deliberately not done here. The in-batch pass
/// is also what keeps the multi-row upsert valid: Postgres rejects a single
/// INSERT .. ON CONFLICT touching the same key twice.
pub fn dedup_by_sku(batch: Vec<CleanRecord>) -> Vec<CleanRecord> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(batch.len());
    let mut deduped: Vec<CleanRecord> = Vec::with_capacity(batch.len());

    for record in batch {
        match seen.get(&record.sku) {
            Some(&slot) => deduped[slot] = record,
            None => {
                seen.insert(record.sku.clone(), deduped.len());
                deduped.push(record);
            },
        }
    }

    deduped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sku: &str, name: &str) -> CleanRecord {
        CleanRecord {
            sku: sku.to_string(),
            name: name.to_string(),
            description: String::new(),
            is_active: true,
        }
    }

    #[test]
    fn test_emits_full_batch_and_resets() {
        let mut acc = BatchAccumulator::new(2);

        assert!(acc.push(record("a", "A")).is_none());
        let batch = acc.push(record("b", "B")).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_finish_emits_residual() {
        let mut acc = BatchAccumulator::new(3);
        acc.push(record("a", "A"));

        let residual = acc.finish().unwrap();
        assert_eq!(residual.len(), 1);
        assert_eq!(residual[0].sku, "a");
    }

    #[test]
    fn test_finish_empty_emits_nothing() {
        let acc = BatchAccumulator::new(3);
        assert!(acc.finish().is_none());
    }

    #[test]
    fn test_dedup_keeps_last_occurrence() {
        let batch = vec![
            record("a", "first"),
            record("b", "B"),
            record("a", "second"),
            record("a", "third"),
        ];

        let deduped = dedup_by_sku(batch);

        assert_eq!(deduped.len(), 2);
        let a = deduped.iter().find(|r| r.sku == "a").unwrap();
        assert_eq!(a.name, "third");
    }

    #[test]
    fn test_dedup_one_record_per_distinct_sku() {
        let batch = vec![
            record("x", "1"),
            record("y", "2"),
            record("x", "3"),
            record("z", "4"),
            record("y", "5"),
        ];

        let deduped = dedup_by_sku(batch);

        let mut skus: Vec<_> = deduped.iter().map(|r| r.sku.as_str()).collect();
        skus.sort_unstable();
        assert_eq!(skus, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_dedup_no_duplicates_is_identity() {
        let batch = vec![record("a", "A"), record("b", "B")];
        let deduped = dedup_by_sku(batch.clone());
        assert_eq!(deduped, batch);
    }
}
