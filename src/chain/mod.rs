//! Fetch-round chaining for one apply step.
//!
//! Rounds run in the fixed order custom, remote (version control or Helm
//! repo), local store, assemble. Every `Continue` carries a complete
//! [`ChainState`] snapshot so the next reply can be handled by any process.
mod local_store;
mod orchestrator;
mod plan;
mod round;
mod state;
mod timeout;

pub use orchestrator::{Orchestrator, PreparedStep};
pub use plan::{plan_rounds, Assignment, RoundPlan};
pub use round::{
    FetchRoundReply, FetchRoundRequest, ReplyOutcome, RoundKind, RoundVariant, UnitProgress,
};
pub use state::{ChainState, ResultMap, ResultSlot, STATE_SCHEMA_VERSION};
pub use timeout::parse_timeout;

use crate::error::{EngineError, FailureKind};
use crate::model::{ManifestSpec, ScopeContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything one apply step hands the engine.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApplyStep {
    pub scope: ScopeContext,
    /// Service-level manifests: one primary plus overlays.
    pub manifests: Vec<ManifestSpec>,
    /// Overrides supplied at apply time; they win over everything else.
    #[serde(default)]
    pub step_overrides: Vec<ManifestSpec>,
    /// Step timeout such as `10m`; the configured default applies when absent.
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub delegate_selectors: Vec<String>,
    /// Opaque infrastructure details passed through to the apply step.
    #[serde(default)]
    pub infrastructure: BTreeMap<String, String>,
}

/// Structured failure; never a raw error crossing the chain boundary.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ChainFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default)]
    pub unit_progress: Vec<UnitProgress>,
    #[serde(default)]
    pub completed_rounds: Vec<RoundKind>,
}

impl ChainFailure {
    pub fn from_error(err: &EngineError, unit_progress: Vec<UnitProgress>) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            unit_progress,
            completed_rounds: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainResult {
    Continue {
        request: Box<FetchRoundRequest>,
        state: Box<ChainState>,
    },
    Done {
        merged: Vec<String>,
    },
    Failed(ChainFailure),
}

impl ChainResult {
    pub(crate) fn failed(err: &EngineError, unit_progress: Vec<UnitProgress>) -> Self {
        ChainResult::Failed(ChainFailure::from_error(err, unit_progress))
    }

    pub fn status(&self) -> &'static str {
        match self {
            ChainResult::Continue { .. } => "continue",
            ChainResult::Done { .. } => "done",
            ChainResult::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
