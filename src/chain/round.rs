//! Round requests sent to the worker transport and the replies it returns.
use crate::fetch::FetchInstruction;
use crate::ports::UnitStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Remote round kinds, in the order a chain runs them.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    Custom,
    VersionControl,
    HelmRepo,
}

impl RoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundKind::Custom => "custom",
            RoundKind::VersionControl => "version_control",
            RoundKind::HelmRepo => "helm_repo",
        }
    }
}

impl fmt::Display for RoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker task variant for a round.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundVariant {
    #[default]
    Standard,
    /// Helm repo round against an ECR-hosted OCI registry.
    Ecr,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FetchRoundRequest {
    pub account_id: String,
    pub round_kind: RoundKind,
    #[serde(default)]
    pub variant: RoundVariant,
    pub instructions: Vec<FetchInstruction>,
    pub timeout_ms: u64,
    pub unit_name: String,
    /// The worker opens the execution log stream on the first remote round.
    pub open_log_stream: bool,
    /// Last remote round of the chain.
    pub close_log_stream: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delegate_selectors: Vec<String>,
}

/// Progress of one log unit as reported by the worker.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct UnitProgress {
    pub unit_name: String,
    pub status: UnitStatus,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FetchRoundReply {
    pub round_kind: RoundKind,
    #[serde(flatten)]
    pub outcome: ReplyOutcome,
    #[serde(default)]
    pub unit_progress: Vec<UnitProgress>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplyOutcome {
    Success {
        /// Fetch key to file contents, in path order.
        per_identifier_contents: BTreeMap<String, Vec<String>>,
    },
    Failure {
        error_message: String,
    },
}

impl FetchRoundReply {
    pub fn success(round_kind: RoundKind, contents: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            round_kind,
            outcome: ReplyOutcome::Success {
                per_identifier_contents: contents,
            },
            unit_progress: Vec::new(),
        }
    }

    pub fn failure(round_kind: RoundKind, message: impl Into<String>) -> Self {
        Self {
            round_kind,
            outcome: ReplyOutcome::Failure {
                error_message: message.into(),
            },
            unit_progress: Vec::new(),
        }
    }
}
