//! The fetch chain state machine.
//!
//! `start` validates the whole manifest set and emits the first remote round
//! (or finishes in-process). `resume` consumes one reply against a snapshot.
//! Configuration errors surface before any round is dispatched.
use super::local_store::LocalStoreRound;
use super::plan::{plan_rounds, RoundPlan};
use super::round::{FetchRoundReply, FetchRoundRequest, ReplyOutcome, RoundKind, RoundVariant};
use super::state::{ChainState, ResultMap, ResultSlot, STATE_SCHEMA_VERSION};
use super::timeout::parse_timeout;
use super::{ApplyStep, ChainFailure, ChainResult};
use crate::assemble::assemble;
use crate::config::EngineConfig;
use crate::connector::RoundConnectors;
use crate::error::{EngineError, Result};
use crate::fetch::{ChartSource, FetchConfigBuilder, FetchInstruction, FetchPayload};
use crate::model::{ManifestSpec, StoreConfig};
use crate::ports::{
    ConnectorService, ExpressionRenderer, FileStore, LogLevel, LogSink, RenderMode, ScopedPath,
    UnitStatus,
};
use crate::render::resolve_manifest;
use crate::values::{aggregate, find_primary, OverrideEntry};
use tracing::{debug, info, warn};

/// Ports the chain needs, plus the engine configuration.
pub struct Orchestrator<'a> {
    pub connectors: &'a dyn ConnectorService,
    pub renderer: &'a dyn ExpressionRenderer,
    pub files: &'a dyn FileStore,
    pub log: &'a dyn LogSink,
    pub config: &'a EngineConfig,
}

/// Aggregated, validated inputs of one apply step.
#[derive(Debug, Clone)]
pub struct PreparedStep {
    pub primary: ManifestSpec,
    pub entries: Vec<OverrideEntry>,
    pub plan: RoundPlan,
    pub timeout_ms: u64,
    pub delegate_selectors: Vec<String>,
}

impl Orchestrator<'_> {
    /// Render, aggregate, plan and dry-build every round without dispatching.
    pub fn prepare(&self, step: &ApplyStep) -> Result<PreparedStep> {
        let manifests = step
            .manifests
            .iter()
            .map(|manifest| resolve_manifest(manifest, self.renderer))
            .collect::<Result<Vec<_>>>()?;
        let step_overrides = step
            .step_overrides
            .iter()
            .map(|manifest| resolve_manifest(manifest, self.renderer))
            .collect::<Result<Vec<_>>>()?;
        let primary = find_primary(&manifests)?.clone();
        let entries = aggregate(&manifests, &step_overrides)?;
        let plan = plan_rounds(&primary, &entries)?;
        let timeout_ms = self.timeout_ms(step.timeout.as_deref())?;

        // The primary may contribute no entry, so its connector is checked on its own.
        RoundConnectors::new(self.connectors, &step.scope)
            .resolve_for(primary.store(), &primary.context())?;
        for round in &plan.rounds {
            self.build_instructions(&step.scope, &primary, &entries, &plan, *round)?;
        }
        for entry in plan.local_entries(&entries) {
            for path in &entry.paths {
                ScopedPath::parse(path)?;
            }
        }

        let mut delegate_selectors: Vec<String> = Vec::new();
        let script_selectors = entries
            .iter()
            .filter_map(|entry| match &entry.store {
                StoreConfig::ScriptRemote(script) => Some(&script.delegate_selectors),
                _ => None,
            })
            .flatten();
        for selector in step.delegate_selectors.iter().chain(script_selectors) {
            let selector = selector.trim();
            if !selector.is_empty() && !delegate_selectors.iter().any(|seen| seen == selector) {
                delegate_selectors.push(selector.to_string());
            }
        }

        Ok(PreparedStep {
            primary,
            entries,
            plan,
            timeout_ms,
            delegate_selectors,
        })
    }

    /// Begin a chain for one apply step.
    pub fn start(&self, step: &ApplyStep) -> ChainResult {
        let prepared = match self.prepare(step) {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(error = %err, "chain rejected before dispatch");
                return ChainResult::failed(&err, Vec::new());
            }
        };
        info!(
            primary = %prepared.primary.identifier,
            entries = prepared.entries.len(),
            rounds = ?prepared.plan.rounds,
            local = prepared.plan.has_local_round,
            "starting fetch chain"
        );
        let state = ChainState {
            schema_version: STATE_SCHEMA_VERSION,
            fingerprint: String::new(),
            scope: step.scope.clone(),
            primary: prepared.primary,
            entries: prepared.entries,
            infrastructure: step.infrastructure.clone(),
            unit_name: self.config.fetch_unit_name.clone(),
            timeout_ms: prepared.timeout_ms,
            delegate_selectors: prepared.delegate_selectors,
            custom_results: ResultMap::new(),
            version_control_results: ResultMap::new(),
            helm_repo_results: ResultMap::new(),
            local_store_results: ResultMap::new(),
            open_log_stream: true,
            log_unit_open: true,
            awaiting: None,
            remaining_rounds: prepared.plan.rounds,
            completed_rounds: Vec::new(),
            unit_progress: Vec::new(),
        };
        let state = match state.sealed() {
            Ok(state) => state,
            Err(err) => return ChainResult::failed(&err, Vec::new()),
        };
        self.log.open_stream(&state.unit_name);
        self.advance(state)
    }

    /// Continue a chain from its snapshot and the awaited round's reply.
    pub fn resume(&self, state: ChainState, reply: FetchRoundReply) -> ChainResult {
        if let Err(err) = state.verify() {
            return self.fail(state, err);
        }
        let Some(awaiting) = state.awaiting else {
            let err = EngineError::corruption(format!(
                "received a {} reply but no round is awaited",
                reply.round_kind
            ));
            return self.fail(state, err);
        };
        if reply.round_kind != awaiting {
            let err = EngineError::corruption(format!(
                "received a {} reply while awaiting the {awaiting} round",
                reply.round_kind
            ));
            return self.fail(state, err);
        }
        let state = state.with_progress(&reply.unit_progress);
        match reply.outcome {
            ReplyOutcome::Failure { error_message } => {
                warn!(round = %awaiting, error = %error_message, "round failed");
                let err = EngineError::RemoteFetchFailure {
                    round: awaiting.to_string(),
                    message: error_message,
                };
                self.fail(state, err)
            }
            ReplyOutcome::Success {
                per_identifier_contents,
            } => match self.accept(&state, awaiting, per_identifier_contents) {
                Ok(results) => {
                    let state = state
                        .with_results(ResultSlot::from(awaiting), results)
                        .completed(awaiting);
                    self.advance(state)
                }
                Err(err) => self.fail(state, err),
            },
        }
    }

    /// Cancel a chain; partial results are discarded with it.
    pub fn abort(&self, state: ChainState, reason: &str) -> ChainResult {
        let round = state
            .awaiting
            .map(|round| round.to_string())
            .unwrap_or_else(|| "chain".to_string());
        self.fail(
            state,
            EngineError::RemoteFetchFailure {
                round,
                message: format!("fetch chain aborted: {reason}"),
            },
        )
    }

    fn timeout_ms(&self, step_timeout: Option<&str>) -> Result<u64> {
        let raw = step_timeout
            .map(str::trim)
            .filter(|timeout| !timeout.is_empty())
            .unwrap_or(self.config.default_timeout.as_str());
        parse_timeout(raw)
            .ok_or_else(|| EngineError::invalid_set(format!("invalid step timeout {raw:?}")))
    }

    fn build_instructions(
        &self,
        scope: &crate::model::ScopeContext,
        primary: &ManifestSpec,
        entries: &[OverrideEntry],
        plan: &RoundPlan,
        round: RoundKind,
    ) -> Result<Vec<FetchInstruction>> {
        let connectors = RoundConnectors::new(self.connectors, scope);
        let mut builder =
            FetchConfigBuilder::new(connectors, self.config.capabilities, &scope.account_id);
        plan.entries_for(round, entries)
            .into_iter()
            .map(|entry| builder.build(entry, primary))
            .collect()
    }

    /// Emit the next remote round, or finish in-process.
    fn advance(&self, state: ChainState) -> ChainResult {
        let Some(round) = state.remaining_rounds.first().copied() else {
            return self.finish(state);
        };
        let plan = match plan_rounds(&state.primary, &state.entries) {
            Ok(plan) => plan,
            Err(err) => return self.fail(state, err),
        };
        let instructions = match self.build_instructions(
            &state.scope,
            &state.primary,
            &state.entries,
            &plan,
            round,
        ) {
            Ok(instructions) => instructions,
            Err(err) => return self.fail(state, err),
        };
        let variant = if round == RoundKind::HelmRepo
            && self.config.capabilities.oci_ecr_task_variant
            && instructions.iter().any(|instruction| {
                matches!(
                    &instruction.payload,
                    FetchPayload::ChartRepository(chart)
                        if matches!(chart.source, ChartSource::Oci { aws_auth: true, .. })
                )
            }) {
            RoundVariant::Ecr
        } else {
            RoundVariant::Standard
        };
        let request = FetchRoundRequest {
            account_id: state.scope.account_id.clone(),
            round_kind: round,
            variant,
            instructions,
            timeout_ms: state.timeout_ms,
            unit_name: state.unit_name.clone(),
            open_log_stream: state.open_log_stream,
            // The worker's stream ends with the last remote round; the local
            // store round logs under the engine's own unit afterwards.
            close_log_stream: state.remaining_rounds.len() == 1,
            delegate_selectors: state.delegate_selectors.clone(),
        };
        self.log.append(
            &state.unit_name,
            &format!(
                "Dispatching {round} fetch round with {} instruction(s)",
                request.instructions.len()
            ),
            LogLevel::Info,
        );
        info!(
            round = %round,
            instructions = request.instructions.len(),
            variant = ?variant,
            "dispatching fetch round"
        );
        ChainResult::Continue {
            request: Box::new(request),
            state: Box::new(state.dispatched(round)),
        }
    }

    /// Check one successful reply against the round's instructions.
    fn accept(
        &self,
        state: &ChainState,
        round: RoundKind,
        mut contents: ResultMap,
    ) -> Result<ResultMap> {
        let plan = plan_rounds(&state.primary, &state.entries)?;
        let mut accepted = ResultMap::new();
        for entry in plan.entries_for(round, &state.entries) {
            let files = contents.remove(&entry.key);
            let returned = files.as_ref().map_or(0, Vec::len);
            if entry.required_if_missing && returned < entry.paths.len() {
                let detail = match files {
                    Some(_) => format!(
                        " in {round} round reply ({returned} of {} file(s) returned)",
                        entry.paths.len()
                    ),
                    None => format!(" in {round} round reply"),
                };
                return Err(EngineError::MissingRequiredPath {
                    identifier: entry.manifest_identifier.clone(),
                    path: entry.paths.join(", "),
                    detail,
                });
            }
            match files {
                Some(files) => {
                    self.log.append(
                        &state.unit_name,
                        &format!("Fetched {} file(s) for {}", files.len(), entry.context()),
                        LogLevel::Info,
                    );
                    accepted.insert(entry.key.clone(), files);
                }
                None => {
                    debug!(key = %entry.key, "optional override absent from reply");
                }
            }
        }
        for unexpected in contents.keys() {
            warn!(round = %round, key = %unexpected, "ignoring unexpected key in reply");
        }
        Ok(accepted)
    }

    /// Local store round, assembly and terminal `Done`.
    fn finish(&self, state: ChainState) -> ChainResult {
        let plan = match plan_rounds(&state.primary, &state.entries) {
            Ok(plan) => plan,
            Err(err) => return self.fail(state, err),
        };
        let state = if plan.has_local_round {
            let round = LocalStoreRound {
                files: self.files,
                log: self.log,
                scope: &state.scope,
                unit: &state.unit_name,
            };
            let outcome = round.run(&plan.local_entries(&state.entries));
            match outcome {
                Ok(results) => state.with_results(ResultSlot::LocalStore, results),
                Err(err) => return self.fail(state, err),
            }
        } else {
            state
        };
        let merged = match assemble(&state.entries, &state) {
            Ok(merged) => merged,
            Err(err) => return self.fail(state, err),
        };
        let merged = if self.config.capabilities.render_fetched_contents {
            let rendered = merged
                .iter()
                .map(|content| {
                    self.renderer.render("override content", content, RenderMode::Lenient)
                })
                .collect::<Result<Vec<_>>>();
            match rendered {
                Ok(rendered) => rendered,
                Err(err) => return self.fail(state, err),
            }
        } else {
            merged
        };
        if state.log_unit_open {
            self.log.append(
                &state.unit_name,
                &format!("Assembled {} override file(s)", merged.len()),
                LogLevel::Info,
            );
            self.log.close(&state.unit_name, UnitStatus::Success);
        }
        info!(contents = merged.len(), "fetch chain done");
        ChainResult::Done { merged }
    }

    /// Close every open unit with a failure line and report a structured failure.
    fn fail(&self, state: ChainState, err: EngineError) -> ChainResult {
        warn!(kind = %err.kind(), error = %err, "fetch chain failed");
        let mut closed = Vec::new();
        if state.log_unit_open {
            self.log.append(&state.unit_name, &err.to_string(), LogLevel::Error);
            self.log.close(&state.unit_name, UnitStatus::Failure);
            closed.push(state.unit_name.clone());
        }
        for unit in state.running_units() {
            if closed.contains(&unit) {
                continue;
            }
            self.log.append(&unit, &err.to_string(), LogLevel::Error);
            self.log.close(&unit, UnitStatus::Failure);
        }
        let mut unit_progress = state.unit_progress;
        for unit in &mut unit_progress {
            if unit.status == UnitStatus::Running {
                unit.status = UnitStatus::Failure;
            }
        }
        let mut failure = ChainFailure::from_error(&err, unit_progress);
        failure.completed_rounds = state.completed_rounds;
        ChainResult::Failed(failure)
    }
}
