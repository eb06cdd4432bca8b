//! File-backed adapters for running the engine from a workspace directory.
//!
//! The CLI resolves every port from files under one root so a chain can be
//! started by one process and resumed by another.
mod connectors;
mod files;
mod log;
mod paths;

pub use connectors::{ConnectorsFile, FileConnectors};
pub use files::DiskFileStore;
pub use log::{JsonlLog, LogRecord};
pub use paths::WorkspacePaths;

use crate::chain::Orchestrator;
use crate::config::{resolve_config, user_config_path, EngineConfig};
use crate::render::VariableRenderer;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Every port and the configuration, loaded once per invocation.
#[derive(Debug)]
pub struct WorkspaceContext {
    pub paths: WorkspacePaths,
    pub config: EngineConfig,
    pub config_source: Option<PathBuf>,
    pub connectors: FileConnectors,
    pub renderer: VariableRenderer,
    pub files: DiskFileStore,
    pub log: JsonlLog,
}

impl WorkspaceContext {
    pub fn load(root: &Path) -> Result<Self> {
        let paths = WorkspacePaths::new(root.to_path_buf());
        let mut candidates = vec![paths.config_path()];
        if let Some(user) = user_config_path() {
            candidates.push(user);
        }
        let (config, config_source) = resolve_config(&candidates)?;

        let connectors_file: ConnectorsFile =
            read_optional_json(&paths.connectors_path())?.unwrap_or_default();
        let secrets: BTreeMap<String, String> =
            read_optional_json(&paths.secrets_path())?.unwrap_or_default();
        let variables: BTreeMap<String, String> =
            read_optional_json(&paths.variables_path())?.unwrap_or_default();

        Ok(Self {
            connectors: FileConnectors::new(connectors_file, secrets),
            renderer: VariableRenderer::new(variables),
            files: DiskFileStore::new(paths.clone()),
            log: JsonlLog::new(paths.clone()),
            paths,
            config,
            config_source,
        })
    }

    pub fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator {
            connectors: &self.connectors,
            renderer: &self.renderer,
            files: &self.files,
            log: &self.log,
            config: &self.config,
        }
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

/// Like [`read_json`], but a missing file is `None`.
pub fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(value).context("serialize json")?;
    fs::write(path, format!("{text}\n")).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_workspace_loads_with_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let context = WorkspaceContext::load(dir.path()).expect("load workspace");
        assert!(context.connectors.is_empty());
        assert_eq!(context.config.fetch_unit_name, "Fetch Files");
    }

    #[test]
    fn workspace_files_feed_the_ports() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = WorkspacePaths::new(dir.path().to_path_buf());
        fs::write(
            paths.config_path(),
            r#"{"schema_version": 1, "fetch_unit_name": "Fetch Overrides"}"#,
        )
        .expect("write config");
        fs::write(
            paths.connectors_path(),
            r#"{"connectors": [{"id": "git", "kind": "git"}]}"#,
        )
        .expect("write connectors");

        let context = WorkspaceContext::load(dir.path()).expect("load workspace");
        assert_eq!(context.config.fetch_unit_name, "Fetch Overrides");
        assert_eq!(context.config_source, Some(paths.config_path()));
        assert_eq!(context.connectors.len(), 1);

        fs::write(paths.secrets_path(), "not json").expect("write secrets");
        let err = WorkspaceContext::load(dir.path()).expect_err("bad secrets");
        assert!(format!("{err:#}").contains("secrets.json"));
    }
}
