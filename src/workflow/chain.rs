//! Start, resume and abort steps.
//!
//! A `Continue` writes `chain/state.json` and `chain/request.json`; a terminal
//! result removes both and writes `chain/result.json`.
use super::{exit_code, load_step, print_json};
use crate::chain::{ChainResult, ChainState, FetchRoundReply};
use crate::cli::{AbortArgs, ResumeArgs, StartArgs};
use crate::workspace::{read_json, write_json, WorkspaceContext};
use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn run_start(args: &StartArgs) -> Result<ExitCode> {
    let ctx = WorkspaceContext::load(&args.workspace)?;
    let step = load_step(&ctx, args.step.as_deref())?;
    let result = ctx.orchestrator().start(&step);
    record(&ctx, &result, args.verbose)
}

pub fn run_resume(args: &ResumeArgs) -> Result<ExitCode> {
    let ctx = WorkspaceContext::load(&args.workspace)?;
    let state = load_state(&ctx, args.state.as_deref())?;
    let reply: FetchRoundReply = read_json(&args.reply)
        .with_context(|| format!("load round reply {}", args.reply.display()))?;
    let result = ctx.orchestrator().resume(state, reply);
    record(&ctx, &result, args.verbose)
}

pub fn run_abort(args: &AbortArgs) -> Result<ExitCode> {
    let ctx = WorkspaceContext::load(&args.workspace)?;
    let state = load_state(&ctx, args.state.as_deref())?;
    let result = ctx.orchestrator().abort(state, &args.reason);
    record(&ctx, &result, args.verbose)
}

fn load_state(ctx: &WorkspaceContext, state: Option<&Path>) -> Result<ChainState> {
    let path: PathBuf = state
        .map(Path::to_path_buf)
        .unwrap_or_else(|| ctx.paths.state_path());
    if !path.is_file() {
        return Err(anyhow::anyhow!(
            "no fetch chain in progress (missing {})",
            path.display()
        ));
    }
    read_json(&path).with_context(|| format!("load chain state {}", path.display()))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
    }
    Ok(())
}

fn record(ctx: &WorkspaceContext, result: &ChainResult, verbose: bool) -> Result<ExitCode> {
    let paths = &ctx.paths;
    match result {
        ChainResult::Continue { request, state } => {
            write_json(&paths.state_path(), state)?;
            write_json(&paths.request_path(), request)?;
            remove_if_exists(&paths.result_path())?;
            if verbose {
                eprintln!(
                    "wrote {} and {}",
                    paths.state_path().display(),
                    paths.request_path().display()
                );
            }
            print_json(&json!({
                "status": result.status(),
                "round_kind": request.round_kind,
                "variant": request.variant,
                "instructions": request.instructions.len(),
                "request": paths.request_path(),
            }))?;
        }
        ChainResult::Done { .. } | ChainResult::Failed(_) => {
            remove_if_exists(&paths.state_path())?;
            remove_if_exists(&paths.request_path())?;
            write_json(&paths.result_path(), result)?;
            if verbose {
                eprintln!("wrote {}", paths.result_path().display());
            }
            print_json(result)?;
        }
    }
    Ok(exit_code(result))
}
