//! Command steps run by the `mchain` binary.
//!
//! Each step loads the workspace, drives the orchestrator once and persists
//! what the next invocation needs.
mod chain;
mod plan;
mod validate;

pub use chain::{run_abort, run_resume, run_start};
pub use plan::{run_plan, PlanReport, PlannedEntry};
pub use validate::{run_validate, ValidationReport};

use crate::chain::{ApplyStep, ChainResult};
use crate::workspace::{read_json, WorkspaceContext};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

/// Exit status when the chain or the step ends in a structured failure.
pub const EXIT_CHAIN_FAILED: u8 = 2;

fn load_step(ctx: &WorkspaceContext, step: Option<&Path>) -> Result<ApplyStep> {
    let path = step
        .map(Path::to_path_buf)
        .unwrap_or_else(|| ctx.paths.step_path());
    read_json(&path).with_context(|| format!("load apply step {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{text}");
    Ok(())
}

fn exit_code(result: &ChainResult) -> ExitCode {
    match result {
        ChainResult::Failed(_) => ExitCode::from(EXIT_CHAIN_FAILED),
        ChainResult::Continue { .. } | ChainResult::Done { .. } => ExitCode::SUCCESS,
    }
}
