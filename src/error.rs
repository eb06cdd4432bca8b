//! Error taxonomy for manifest resolution and fetch chaining.
//!
//! Every failure the engine can produce is one of these variants. None of them
//! is retried here; retries belong to the worker transport. Configuration-class
//! errors are raised before any round is dispatched, round-class errors on
//! reply, and defects indicate a broken internal invariant.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine errors, grouped by when they can occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The resolved connector's credential kind does not fit the store kind.
    #[error("Invalid connector selected in {context}. Select {expected} connector")]
    ConnectorMismatch { context: String, expected: String },

    /// The connector reference could not be resolved in the step's scope.
    #[error("connector [{connector_ref}] not found for {context}")]
    ConnectorNotFound {
        connector_ref: String,
        context: String,
    },

    #[error("Unsupported store kind [{kind}] for {context}")]
    UnsupportedStoreKind { kind: String, context: String },

    #[error("Unsupported manifest type [{kind}] for {context}")]
    UnsupportedManifestKind { kind: String, context: String },

    /// The manifest set presented to one apply step is malformed.
    #[error("invalid manifest set: {message}")]
    InvalidManifestSet { message: String },

    #[error("invalid store configuration for {context}: {message}")]
    InvalidStoreConfig { context: String, message: String },

    /// A strict-mode expression could not be resolved.
    #[error("unresolved expression {expression} in {field}")]
    UnresolvedExpression { field: String, expression: String },

    /// The manifest set would need both a git round and a helm repo round.
    #[error(
        "manifest [{primary}] is fetched from a chart repository but override [{identifier}] \
         is stored in version control; move the override into the chart or the chart into git"
    )]
    MixedRemoteBackends { primary: String, identifier: String },

    /// A path marked required was absent from a round's reply.
    #[error("required file(s) {path} not found for manifest [{identifier}]{detail}")]
    MissingRequiredPath {
        identifier: String,
        path: String,
        detail: String,
    },

    /// The worker reported a transport, credential or repository error.
    #[error("{message}")]
    RemoteFetchFailure { round: String, message: String },

    /// Internal invariant violation in the pass-through state.
    #[error("chain state corruption: {message}")]
    ChainStateCorruption { message: String },
}

impl EngineError {
    pub fn mismatch(context: impl Into<String>, expected: impl Into<String>) -> Self {
        EngineError::ConnectorMismatch {
            context: context.into(),
            expected: expected.into(),
        }
    }

    pub fn unsupported_store(kind: impl fmt::Display, context: impl Into<String>) -> Self {
        EngineError::UnsupportedStoreKind {
            kind: kind.to_string(),
            context: context.into(),
        }
    }

    pub fn unsupported_manifest(kind: impl fmt::Display, context: impl Into<String>) -> Self {
        EngineError::UnsupportedManifestKind {
            kind: kind.to_string(),
            context: context.into(),
        }
    }

    pub fn invalid_set(message: impl Into<String>) -> Self {
        EngineError::InvalidManifestSet {
            message: message.into(),
        }
    }

    pub fn invalid_store(context: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidStoreConfig {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn corruption(message: impl Into<String>) -> Self {
        EngineError::ChainStateCorruption {
            message: message.into(),
        }
    }

    /// Stable failure tag carried in structured chain failures.
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::ConnectorMismatch { .. } => FailureKind::ConnectorMismatch,
            EngineError::ConnectorNotFound { .. } => FailureKind::ConnectorNotFound,
            EngineError::UnsupportedStoreKind { .. } => FailureKind::UnsupportedStoreKind,
            EngineError::UnsupportedManifestKind { .. } => FailureKind::UnsupportedManifestKind,
            EngineError::InvalidManifestSet { .. } => FailureKind::InvalidManifestSet,
            EngineError::InvalidStoreConfig { .. } => FailureKind::InvalidStoreConfig,
            EngineError::UnresolvedExpression { .. } => FailureKind::UnresolvedExpression,
            EngineError::MixedRemoteBackends { .. } => FailureKind::MixedRemoteBackends,
            EngineError::MissingRequiredPath { .. } => FailureKind::MissingRequiredPath,
            EngineError::RemoteFetchFailure { .. } => FailureKind::RemoteFetchFailure,
            EngineError::ChainStateCorruption { .. } => FailureKind::ChainStateCorruption,
        }
    }

    /// Detected before dispatch; short-circuits the chain.
    pub fn is_configuration(&self) -> bool {
        self.kind().class() == FailureClass::Configuration
    }

    /// Detected on a round reply.
    pub fn is_round(&self) -> bool {
        self.kind().class() == FailureClass::Round
    }

    /// Never user-facing.
    pub fn is_defect(&self) -> bool {
        self.kind().class() == FailureClass::Defect
    }
}

/// Failure tags used in `chain/result.json` and tests.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConnectorMismatch,
    ConnectorNotFound,
    UnsupportedStoreKind,
    UnsupportedManifestKind,
    InvalidManifestSet,
    InvalidStoreConfig,
    UnresolvedExpression,
    MixedRemoteBackends,
    MissingRequiredPath,
    RemoteFetchFailure,
    ChainStateCorruption,
}

/// When in the chain a failure kind can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Configuration,
    Round,
    Defect,
}

impl FailureKind {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ConnectorMismatch => "connector_mismatch",
            FailureKind::ConnectorNotFound => "connector_not_found",
            FailureKind::UnsupportedStoreKind => "unsupported_store_kind",
            FailureKind::UnsupportedManifestKind => "unsupported_manifest_kind",
            FailureKind::InvalidManifestSet => "invalid_manifest_set",
            FailureKind::InvalidStoreConfig => "invalid_store_config",
            FailureKind::UnresolvedExpression => "unresolved_expression",
            FailureKind::MixedRemoteBackends => "mixed_remote_backends",
            FailureKind::MissingRequiredPath => "missing_required_path",
            FailureKind::RemoteFetchFailure => "remote_fetch_failure",
            FailureKind::ChainStateCorruption => "chain_state_corruption",
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            FailureKind::MissingRequiredPath | FailureKind::RemoteFetchFailure => {
                FailureClass::Round
            }
            FailureKind::ChainStateCorruption => FailureClass::Defect,
            _ => FailureClass::Configuration,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
