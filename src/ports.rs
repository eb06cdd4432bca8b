//! External collaborators the engine consumes.
//!
//! The engine never reaches a network or a database itself. Connector lookup,
//! secret decryption, expression rendering, execution logs and the internal
//! file store are all injected through these traits.
use crate::error::{EngineError, Result};
use crate::model::{Connector, DecryptedCredential, ScopeContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Connector resolution and secret decryption.
pub trait ConnectorService {
    /// Resolve a connector reference in the step's scope; `None` when absent.
    fn get_connector(&self, connector_ref: &str, scope: &ScopeContext) -> Result<Option<Connector>>;

    fn decrypt(
        &self,
        payload: &BTreeMap<String, String>,
        encryption_refs: &[String],
    ) -> Result<DecryptedCredential>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Unresolved expressions are an error.
    Strict,
    /// Unresolved expressions are left verbatim.
    Lenient,
}

/// Resolves variable expressions inside free-text fields.
pub trait ExpressionRenderer {
    /// `field` names the rendered field for error messages.
    fn render(&self, field: &str, raw: &str, mode: RenderMode) -> Result<String>;
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Running,
    Success,
    Failure,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Running => "running",
            UnitStatus::Success => "success",
            UnitStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing execution log, one stream per unit name.
///
/// Sink failures never fail a chain; implementations report them as diagnostics.
pub trait LogSink {
    fn open_stream(&self, unit: &str);
    fn append(&self, unit: &str, line: &str, level: LogLevel);
    fn close(&self, unit: &str, status: UnitStatus);
}

/// Scope a file-store reference points into.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FileScope {
    Account,
    Org,
    Project,
}

impl FileScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileScope::Account => "account",
            FileScope::Org => "org",
            FileScope::Project => "project",
        }
    }
}

/// Parsed `account:/p`, `org:/p` or `/p` file-store reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedPath {
    pub scope: FileScope,
    pub path: String,
}

impl ScopedPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (scope, rest) = if let Some(rest) = trimmed.strip_prefix("account:") {
            (FileScope::Account, rest)
        } else if let Some(rest) = trimmed.strip_prefix("org:") {
            (FileScope::Org, rest)
        } else {
            (FileScope::Project, trimmed)
        };
        let path = rest.trim();
        if path.is_empty() || path == "/" {
            return Err(EngineError::invalid_store(
                "file store reference",
                format!("blank path in reference {raw:?}"),
            ));
        }
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Ok(Self { scope, path })
    }
}

impl fmt::Display for ScopedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            FileScope::Project => f.write_str(&self.path),
            scope => write!(f, "{}:{}", scope.as_str(), self.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStoreNode {
    File { content: String },
    Folder,
}

/// Internal file store, resolved synchronously.
pub trait FileStore {
    fn get(&self, scope: &ScopeContext, path: &ScopedPath) -> Result<Option<FileStoreNode>>;
}
