use anyhow::Result;
use clap::Parser;
use manifest_chain::cli::{Command, RootArgs};
use manifest_chain::workflow;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the diagnostic filter.
const LOG_ENV: &str = "MCHAIN_LOG";

fn init_tracing(verbose: bool) {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ if verbose => EnvFilter::new("debug"),
        _ => EnvFilter::new("warn"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let args = RootArgs::parse();
    init_tracing(args.command.verbose());
    match &args.command {
        Command::Plan(args) => workflow::run_plan(args),
        Command::Validate(args) => workflow::run_validate(args),
        Command::Start(args) => workflow::run_start(args),
        Command::Resume(args) => workflow::run_resume(args),
        Command::Abort(args) => workflow::run_abort(args),
    }
}
