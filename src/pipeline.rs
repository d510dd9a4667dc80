//! One reconciliation run, stage by stage.
//!
//! Import and merge, match, resolve, export, edit, audit. Per-item failures
//! are absorbed by each stage; only failures outside a single item (an
//! unreadable inventory directory, an output file that cannot be written)
//! abort the run.
use crate::config::{SyncConfig, SyncPaths};
use crate::editor::edit_documents;
use crate::export::{write_audit_log, write_clean_dataset, write_full_dataset};
use crate::matcher::{list_documents, match_documents, DocumentFile, MatchSummary};
use crate::merge::{merge_exports, MergeSummary};
use crate::model::{clean_dataset, AuditEntry, CanonicalDataset};
use crate::resolve::{resolve_addresses, Resolver};
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Compute every outcome without writing documents or output files.
    pub dry_run: bool,
    pub skip_resolve: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub exports_read: usize,
    pub exports_skipped: usize,
    pub records: usize,
    pub matched: usize,
    pub resolved: usize,
    /// Nodes whose documents were (or, in a dry run, would be) rewritten.
    pub updated: Vec<String>,
    pub audit: Vec<AuditEntry>,
    pub dry_run: bool,
}

/// Dataset after the import and match stages, before any lookups.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub dataset: CanonicalDataset,
    pub documents: Vec<DocumentFile>,
    pub merge: MergeSummary,
    pub matching: MatchSummary,
}

/// Import every export and claim records for the inventory's documents.
pub fn scan_inventory(config: &SyncConfig, paths: &SyncPaths) -> Result<ScanResult> {
    let mut dataset = CanonicalDataset::new();
    let merge = merge_exports(paths.exports(), &mut dataset);
    tracing::info!(
        read = merge.exports_read,
        skipped = merge.exports_skipped,
        records = dataset.len(),
        "import complete"
    );

    let documents = list_documents(paths.inventory_dir(), &config.domain)?;
    let matching = match_documents(&documents, &mut dataset);
    tracing::info!(
        documents = matching.scanned,
        matched = matching.matched,
        unreadable = matching.failed,
        "match complete"
    );

    Ok(ScanResult {
        dataset,
        documents,
        merge,
        matching,
    })
}

/// Run every stage. `resolver` is only consulted when resolution is not skipped.
pub fn run_sync(
    config: &SyncConfig,
    paths: &SyncPaths,
    resolver: Option<&dyn Resolver>,
    options: RunOptions,
) -> Result<RunReport> {
    let ScanResult {
        mut dataset,
        documents,
        merge,
        matching,
    } = scan_inventory(config, paths)?;

    let mut resolved = 0;
    match resolver.filter(|_| !options.skip_resolve) {
        Some(resolver) => {
            let summary = resolve_addresses(&mut dataset, resolver, &config.domain);
            tracing::info!(
                attempted = summary.attempted,
                resolved = summary.resolved,
                failed = summary.failed,
                "resolution complete"
            );
            resolved = summary.resolved;
        }
        None => tracing::info!("skipping management address resolution"),
    }

    let clean = if options.dry_run {
        clean_dataset(&dataset)
    } else {
        write_full_dataset(paths.full_dataset_path(), &dataset)?;
        write_clean_dataset(paths.clean_dataset_path(), &dataset)?
    };

    let edits = edit_documents(&documents, &clean, &config.serializer, options.dry_run);
    tracing::info!(
        updated = edits.updated.len(),
        unedited = edits.audit.len(),
        dry_run = options.dry_run,
        "edit complete"
    );
    if !options.dry_run {
        write_audit_log(paths.audit_log_path(), &edits.audit)?;
    }

    Ok(RunReport {
        exports_read: merge.exports_read,
        exports_skipped: merge.exports_skipped,
        records: dataset.len(),
        matched: matching.matched,
        resolved,
        updated: edits.updated,
        audit: edits.audit,
        dry_run: options.dry_run,
    })
}
