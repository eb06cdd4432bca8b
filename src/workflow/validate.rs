//! Workflow validate step.
//!
//! Surfaces every configuration-class failure without dispatching a round.
use super::{load_step, print_json, EXIT_CHAIN_FAILED};
use crate::chain::ChainFailure;
use crate::cli::ValidateArgs;
use crate::workspace::WorkspaceContext;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ChainFailure>,
}

pub fn run_validate(args: &ValidateArgs) -> Result<ExitCode> {
    let ctx = WorkspaceContext::load(&args.workspace)?;
    let step = load_step(&ctx, args.step.as_deref())?;
    let failure = ctx
        .orchestrator()
        .prepare(&step)
        .err()
        .map(|err| ChainFailure::from_error(&err, Vec::new()));
    let report = ValidationReport {
        valid: failure.is_none(),
        config_source: ctx.config_source.clone(),
        failure,
    };
    if args.verbose {
        match &ctx.config_source {
            Some(path) => eprintln!("config: {}", path.display()),
            None => eprintln!("config: built-in defaults"),
        }
    }
    print_json(&report)?;
    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_CHAIN_FAILED)
    })
}
