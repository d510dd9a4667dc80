//! Command runners behind the `invsync` subcommands.
use crate::cli::{InitArgs, RunArgs, ScanArgs};
use anyhow::{anyhow, Context, Result};
use inventory_sync::config::{self, SyncConfig, SyncPaths};
use inventory_sync::model::AssetRecord;
use inventory_sync::pipeline::{run_sync, scan_inventory, RunOptions, RunReport};
use inventory_sync::resolve::{HostCommandResolver, Resolver};
use inventory_sync::util::display_path;
use serde::Serialize;
use std::path::PathBuf;

pub fn run_init(args: InitArgs) -> Result<()> {
    if args.config.is_file() && !args.force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            args.config.display()
        ));
    }
    let config = config::default_config(args.domain.trim());
    config::validate_config(&config)?;
    config::write_config(&args.config, &config)?;
    println!("wrote {}", args.config.display());
    Ok(())
}

#[derive(Serialize)]
struct ScanReport<'a> {
    exports_read: usize,
    exports_skipped: usize,
    documents: usize,
    matched: usize,
    records: Vec<&'a AssetRecord>,
}

pub fn run_scan(args: ScanArgs) -> Result<()> {
    let (config, paths) = load_context(args.config)?;
    let scan = scan_inventory(&config, &paths)?;
    let report = ScanReport {
        exports_read: scan.merge.exports_read,
        exports_skipped: scan.merge.exports_skipped,
        documents: scan.documents.len(),
        matched: scan.matching.matched,
        records: scan.dataset.values().collect(),
    };
    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize scan report")?;
        println!("{text}");
        return Ok(());
    }

    for record in &report.records {
        println!(
            "{}\t{}\t{}",
            record.tag,
            record.end_of_service,
            record.node.as_deref().unwrap_or("-")
        );
    }
    println!(
        "{} records from {} exports ({} skipped); {} of {} documents matched",
        report.records.len(),
        report.exports_read,
        report.exports_skipped,
        report.matched,
        report.documents
    );
    Ok(())
}

pub fn run_run(args: RunArgs) -> Result<()> {
    let (config, paths) = load_context(args.config)?;
    let options = RunOptions {
        dry_run: args.dry_run,
        skip_resolve: args.skip_resolve || !config.resolver.enabled,
    };
    let resolver = if options.skip_resolve {
        None
    } else {
        Some(HostCommandResolver::from_config(&config.resolver)?)
    };
    let report = run_sync(
        &config,
        &paths,
        resolver.as_ref().map(|resolver| resolver as &dyn Resolver),
        options,
    )?;

    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize run report")?;
        println!("{text}");
        return Ok(());
    }
    print_run_summary(&report, &paths);
    Ok(())
}

fn print_run_summary(report: &RunReport, paths: &SyncPaths) {
    let verb = if report.dry_run { "would update" } else { "updated" };
    for node in &report.updated {
        println!("{verb} {node}");
    }
    for entry in &report.audit {
        println!("unedited {} ({})", entry.node, entry.reason);
    }
    println!(
        "{} records, {} matched, {} resolved; {} {verb}, {} unedited",
        report.records,
        report.matched,
        report.resolved,
        report.updated.len(),
        report.audit.len()
    );
    if !report.dry_run {
        let base = Some(paths.base());
        println!(
            "wrote {}, {}, {}",
            display_path(paths.full_dataset_path(), base),
            display_path(paths.clean_dataset_path(), base),
            display_path(paths.audit_log_path(), base)
        );
    }
}

fn load_context(config_path: Option<PathBuf>) -> Result<(SyncConfig, SyncPaths)> {
    let config_path = match config_path {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let config = config::load_config(&config_path)?;
    let paths = SyncPaths::for_config_file(&config_path, &config);
    tracing::debug!(config = %config_path.display(), "loaded config");
    Ok((config, paths))
}
