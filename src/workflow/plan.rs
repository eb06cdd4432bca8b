//! Dry-run planning: aggregated overrides and the rounds that would serve them.
use super::{load_step, print_json, EXIT_CHAIN_FAILED};
use crate::chain::{Assignment, ChainFailure, RoundKind};
use crate::cli::PlanArgs;
use crate::model::ManifestKind;
use crate::values::OverrideLayer;
use crate::workspace::WorkspaceContext;
use anyhow::Result;
use serde::Serialize;
use std::process::ExitCode;

#[derive(Debug, Serialize)]
pub struct PlannedEntry {
    pub key: String,
    pub manifest_identifier: String,
    pub manifest_kind: ManifestKind,
    pub layer: OverrideLayer,
    pub store_kind: String,
    pub required_if_missing: bool,
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<Assignment>,
}

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub primary: String,
    pub timeout_ms: u64,
    pub rounds: Vec<RoundKind>,
    pub has_local_round: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delegate_selectors: Vec<String>,
    pub entries: Vec<PlannedEntry>,
}

/// Print the plan; a configuration failure is printed and exits non-zero.
pub fn run_plan(args: &PlanArgs) -> Result<ExitCode> {
    let ctx = WorkspaceContext::load(&args.workspace)?;
    let step = load_step(&ctx, args.step.as_deref())?;
    let prepared = match ctx.orchestrator().prepare(&step) {
        Ok(prepared) => prepared,
        Err(err) => {
            print_json(&ChainFailure::from_error(&err, Vec::new()))?;
            return Ok(ExitCode::from(EXIT_CHAIN_FAILED));
        }
    };
    let entries = prepared
        .entries
        .iter()
        .map(|entry| PlannedEntry {
            key: entry.key.clone(),
            manifest_identifier: entry.manifest_identifier.clone(),
            manifest_kind: entry.manifest_kind,
            layer: entry.layer,
            store_kind: entry.store_kind().to_string(),
            required_if_missing: entry.required_if_missing,
            paths: entry.paths.clone(),
            assignment: prepared.plan.assignments.get(&entry.key).copied(),
        })
        .collect();
    let report = PlanReport {
        primary: prepared.primary.identifier.clone(),
        timeout_ms: prepared.timeout_ms,
        rounds: prepared.plan.rounds.clone(),
        has_local_round: prepared.plan.has_local_round,
        delegate_selectors: prepared.delegate_selectors.clone(),
        entries,
    };
    if args.verbose {
        eprintln!(
            "planned {} override(s) across {} remote round(s)",
            report.entries.len(),
            report.rounds.len()
        );
    }
    print_json(&report)?;
    Ok(ExitCode::SUCCESS)
}
