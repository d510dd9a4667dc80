use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod workflow;

use cli::{Command, RootArgs};

const LOG_ENV: &str = "INVSYNC_LOG";

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_logging(args.verbose);
    match args.command {
        Command::Init(args) => workflow::run_init(args),
        Command::Scan(args) => workflow::run_scan(args),
        Command::Run(args) => workflow::run_run(args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
