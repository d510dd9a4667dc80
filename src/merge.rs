//! Fold export rows into the canonical dataset.
//!
//! The first export to mention a tag owns its date; later sightings are
//! dropped. A broken export is logged and skipped so the rest still merge.
use crate::import::{read_export, ExportRow, ImportOutcome};
use crate::model::{normalize_tag, AssetRecord, CanonicalDataset};
use std::path::PathBuf;

/// Per-run counters for the import stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub exports_read: usize,
    pub exports_skipped: usize,
    pub inserted: usize,
}

/// Insert rows whose normalized tag is not present yet. Returns the insert count.
pub fn merge_rows(dataset: &mut CanonicalDataset, rows: &[ExportRow]) -> usize {
    let mut inserted = 0;
    for row in rows {
        let tag = normalize_tag(&row.tag);
        if tag.is_empty() || dataset.contains_key(&tag) {
            continue;
        }
        dataset.insert(tag, AssetRecord::new(&row.tag, &row.end_of_service));
        inserted += 1;
    }
    inserted
}

/// Import every export in order, merging into `dataset`.
pub fn merge_exports(exports: &[PathBuf], dataset: &mut CanonicalDataset) -> MergeSummary {
    let mut summary = MergeSummary::default();
    for path in exports {
        match read_export(path) {
            Ok(ImportOutcome::Rows(rows)) => {
                let inserted = merge_rows(dataset, &rows);
                tracing::info!(
                    path = %path.display(),
                    rows = rows.len(),
                    inserted,
                    "merged export"
                );
                summary.exports_read += 1;
                summary.inserted += inserted;
            }
            Ok(ImportOutcome::MissingHeader) => {
                tracing::warn!(path = %path.display(), "skipping export: no valid header found");
                summary.exports_skipped += 1;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "skipping export: {err:#}");
                summary.exports_skipped += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(tag: &str, date: &str) -> ExportRow {
        ExportRow {
            tag: tag.to_string(),
            end_of_service: date.to_string(),
        }
    }

    #[test]
    fn first_writer_wins_across_case() {
        let mut dataset = CanonicalDataset::new();
        merge_rows(&mut dataset, &[row("abc123", "2024-01-01")]);
        let inserted = merge_rows(&mut dataset, &[row("ABC123", "2030-12-31")]);

        assert_eq!(inserted, 0);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset["ABC123"].end_of_service, "2024-01-01");
    }

    #[test]
    fn remerging_same_rows_is_idempotent() {
        let rows = vec![row("A1", "2024-01-01"), row("B2", "2024-02-02")];
        let mut dataset = CanonicalDataset::new();
        merge_rows(&mut dataset, &rows);
        let snapshot = dataset.clone();
        merge_rows(&mut dataset, &rows);
        assert_eq!(dataset, snapshot);
    }

    #[test]
    fn unreadable_and_headerless_exports_are_skipped() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let good = dir.path().join("good.csv");
        let headerless = dir.path().join("headerless.csv");
        std::fs::write(&good, "Tag,Existing End Date\nA1,2024-01-01\n").expect("write good");
        std::fs::write(&headerless, "nothing,useful\n").expect("write headerless");
        let missing = dir.path().join("missing.csv");

        let mut dataset = CanonicalDataset::new();
        let summary = merge_exports(&[missing, headerless, good], &mut dataset);

        assert_eq!(summary.exports_read, 1);
        assert_eq!(summary.exports_skipped, 2);
        assert!(dataset.contains_key("A1"));
    }
}
