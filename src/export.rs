//! Tabular artifacts written at the end of the record stages.
//!
//! All three files are rebuilt from scratch on every run and published
//! atomically.
use crate::model::{clean_dataset, AssetRecord, AuditEntry, CanonicalDataset, CleanDataset};
use crate::staging::write_atomic;
use anyhow::{anyhow, Context, Result};
use std::path::Path;

pub const DATASET_COLUMNS: [&str; 4] = [
    "Service Tag",
    "End of Service Date",
    "Node Name",
    "iDRAC IP",
];
pub const AUDIT_COLUMNS: [&str; 3] = ["Node Name", "Service Tag", "Reason"];

/// Write every record, sorted by tag.
pub fn write_full_dataset(path: &Path, dataset: &CanonicalDataset) -> Result<()> {
    let bytes = dataset_csv(dataset.values())?;
    write_atomic(path, &bytes)?;
    tracing::info!(path = %path.display(), rows = dataset.len(), "wrote full dataset");
    Ok(())
}

/// Write the matched subset and hand it back to the caller.
pub fn write_clean_dataset(path: &Path, dataset: &CanonicalDataset) -> Result<CleanDataset> {
    let clean = clean_dataset(dataset);
    let bytes = dataset_csv(clean.values())?;
    write_atomic(path, &bytes)?;
    tracing::info!(path = %path.display(), rows = clean.len(), "wrote clean dataset");
    Ok(clean)
}

pub fn write_audit_log(path: &Path, audit: &[AuditEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(AUDIT_COLUMNS)
        .context("encode audit header")?;
    for entry in audit {
        let reason = entry.reason.to_string();
        writer
            .write_record([entry.node.as_str(), entry.tag.as_str(), reason.as_str()])
            .with_context(|| format!("encode audit row for {}", entry.node))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("flush audit log: {}", err.error()))?;
    write_atomic(path, &bytes)?;
    tracing::info!(path = %path.display(), entries = audit.len(), "wrote audit log");
    Ok(())
}

fn dataset_csv<'a>(records: impl Iterator<Item = &'a AssetRecord>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(DATASET_COLUMNS)
        .context("encode dataset header")?;
    for record in records {
        writer
            .write_record([
                record.tag.as_str(),
                record.end_of_service.as_str(),
                record.node.as_deref().unwrap_or(""),
                record.management_address.as_deref().unwrap_or(""),
            ])
            .with_context(|| format!("encode dataset row for {}", record.tag))?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow!("flush dataset: {}", err.error()))
}
