//! CLI argument parsing for the inventory sync workflow.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "invsync",
    version,
    about = "Reconcile vendor lifecycle exports with host_vars documents",
    after_help = "Commands:\n  init --config <file> --domain <d>  Write a config stub\n  scan                               Import exports and match documents (read-only)\n  run                                Full sync: resolve, export, edit, audit\n\nExamples:\n  invsync init --config ./invsync.json --domain cluster.example.edu\n  invsync scan --config ./invsync.json --json\n  invsync run --config ./invsync.json --dry-run",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log at debug level unless INVSYNC_LOG says otherwise
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Scan(ScanArgs),
    Run(RunArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Write a config stub for a fleet domain")]
pub struct InitArgs {
    /// Config file to create
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    /// Fleet domain embedded in document names
    #[arg(long, value_name = "DOMAIN")]
    pub domain: String,

    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,
}

/// Import and match without resolving or writing anything.
#[derive(Parser, Debug)]
#[command(about = "Import exports and match host_vars documents")]
pub struct ScanArgs {
    /// Config file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Run the full sync and rewrite host_vars documents")]
pub struct RunArgs {
    /// Config file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report what would change without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Do not look up management addresses
    #[arg(long)]
    pub skip_resolve: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
