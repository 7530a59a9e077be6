//! Record normalizer
//!
//! Turns one raw CSV row into a cleaned product candidate, or rejects it.
//! Rejection is silent by design: a malformed row is filtered, not an error.

use csv::StringRecord;
use serde::{Deserialize, Serialize};

/// A cleaned, validated product candidate produced from one source row.
///
/// Invariant: `sku` is lowercase and trimmed, `name` is trimmed, and both are
/// non-empty. `description` is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub sku: String,
    pub name: String,
    pub description: String,
    /// Imported records are always active; the upsert path never flips this
    /// on existing rows.
    pub is_active: bool,
}

/// Normalizes raw rows against the column layout of one source artifact.
///
/// Column positions are resolved once from the header row; unrecognized
/// columns are ignored, and a missing `description` column reads as empty.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    sku_idx: Option<usize>,
    name_idx: Option<usize>,
    description_idx: Option<usize>,
}

impl RecordNormalizer {
    /// Resolve recognized columns from the header row
    pub fn from_headers(headers: &StringRecord) -> Self {
        let position = |wanted: &str| {
            headers
                .iter()
                .position(|column| column.trim().eq_ignore_ascii_case(wanted))
        };

        Self {
            sku_idx: position("sku"),
            name_idx: position("name"),
            description_idx: position("description"),
        }
    }

    /// Normalize one raw row into a [`CleanRecord`]
    ///
    /// Returns `None` when the trimmed `sku` or `name` is empty (including
    /// when the column is absent). Such rows are dropped without logging and
    /// without counting as processed.
    pub fn normalize(&self, record: &StringRecord) -> Option<CleanRecord> {
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let sku = field(self.sku_idx).trim().to_lowercase();
        let name = field(self.name_idx).trim().to_string();
        let description = field(self.description_idx).to_string();

        if sku.is_empty() || name.is_empty() {
            return None;
        }

        Some(CleanRecord {
            sku,
            name,
            description,
            is_active: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> StringRecord {
        StringRecord::from(cols.to_vec())
    }

    fn row(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn test_normalizes_sku_and_name() {
        let normalizer = RecordNormalizer::from_headers(&headers(&["sku", "name", "description"]));

        let record = normalizer
            .normalize(&row(&["  ABC-123 ", "  Widget ", "A widget"]))
            .unwrap();

        assert_eq!(record.sku, "abc-123");
        assert_eq!(record.name, "Widget");
        assert_eq!(record.description, "A widget");
        assert!(record.is_active);
    }

    #[test]
    fn test_description_passed_through_untrimmed() {
        let normalizer = RecordNormalizer::from_headers(&headers(&["sku", "name", "description"]));

        let record = normalizer
            .normalize(&row(&["a1", "Widget", "  spaced  "]))
            .unwrap();

        assert_eq!(record.description, "  spaced  ");
    }

    #[test]
    fn test_missing_description_column_reads_empty() {
        let normalizer = RecordNormalizer::from_headers(&headers(&["sku", "name"]));

        let record = normalizer.normalize(&row(&["a1", "Widget"])).unwrap();

        assert_eq!(record.description, "");
    }

    #[test]
    fn test_blank_sku_is_dropped() {
        let normalizer = RecordNormalizer::from_headers(&headers(&["sku", "name"]));

        assert!(normalizer.normalize(&row(&["   ", "Widget"])).is_none());
    }

    #[test]
    fn test_blank_name_is_dropped() {
        let normalizer = RecordNormalizer::from_headers(&headers(&["sku", "name"]));

        assert!(normalizer.normalize(&row(&["a1", "  "])).is_none());
    }

    #[test]
    fn test_missing_sku_column_drops_every_row() {
        let normalizer = RecordNormalizer::from_headers(&headers(&["name", "description"]));

        assert!(normalizer.normalize(&row(&["Widget", "desc"])).is_none());
    }

    #[test]
    fn test_extra_columns_ignored() {
        let normalizer =
            RecordNormalizer::from_headers(&headers(&["price", "sku", "color", "name"]));

        let record = normalizer
            .normalize(&row(&["9.99", "A1", "red", "Widget"]))
            .unwrap();

        assert_eq!(record.sku, "a1");
        assert_eq!(record.name, "Widget");
    }
}
