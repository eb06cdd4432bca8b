//! In-memory port fakes shared by unit tests.
use crate::error::{EngineError, Result};
use crate::model::{
    ApiAccess, Connector, CredentialKind, DecryptedCredential, FileStoreRef, GitConnectionType,
    GitFetchType, GitProvider, GitStore, HttpRepoStore, InheritStore, InlineStore, ManifestBody,
    ManifestSpec, ScopeContext, ScriptStore, StoreConfig,
};
use crate::ports::{
    ConnectorService, FileStore, FileStoreNode, LogLevel, LogSink, ScopedPath, UnitStatus,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

pub(crate) fn connector(id: &str, kind: CredentialKind) -> Connector {
    let mut payload = BTreeMap::new();
    payload.insert("username".to_string(), "deployer".to_string());
    payload.insert("password".to_string(), format!("{id}-password"));
    Connector {
        id: id.to_string(),
        name: id.to_string(),
        kind,
        url: Some(format!("https://example.com/{id}")),
        connection_type: GitConnectionType::Repo,
        credential_payload: payload,
        encryption_refs: vec!["password".to_string()],
        api_access: None,
        aws_auth: false,
    }
}

pub(crate) fn with_api_access(mut connector: Connector) -> Connector {
    let mut payload = BTreeMap::new();
    payload.insert("token".to_string(), format!("{}-token", connector.id));
    connector.api_access = Some(ApiAccess {
        payload,
        encryption_refs: vec!["token".to_string()],
    });
    connector
}

#[derive(Default)]
pub(crate) struct FakeConnectors {
    pub(crate) connectors: BTreeMap<String, Connector>,
    pub(crate) lookups: Cell<usize>,
    pub(crate) decrypts: Cell<usize>,
}

impl FakeConnectors {
    pub(crate) fn with(connectors: Vec<Connector>) -> Self {
        Self {
            connectors: connectors
                .into_iter()
                .map(|connector| (connector.id.clone(), connector))
                .collect(),
            ..Self::default()
        }
    }
}

impl ConnectorService for FakeConnectors {
    fn get_connector(
        &self,
        connector_ref: &str,
        _scope: &ScopeContext,
    ) -> Result<Option<Connector>> {
        self.lookups.set(self.lookups.get() + 1);
        Ok(self.connectors.get(connector_ref).cloned())
    }

    fn decrypt(
        &self,
        payload: &BTreeMap<String, String>,
        encryption_refs: &[String],
    ) -> Result<DecryptedCredential> {
        self.decrypts.set(self.decrypts.get() + 1);
        let fields = payload
            .iter()
            .map(|(key, value)| {
                let value = if encryption_refs.contains(key) {
                    format!("decrypted:{value}")
                } else {
                    value.clone()
                };
                (key.clone(), value)
            })
            .collect();
        Ok(DecryptedCredential { fields })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogEvent {
    Open(String),
    Line(String, String, LogLevel),
    Close(String, UnitStatus),
}

#[derive(Default)]
pub(crate) struct MemoryLog {
    pub(crate) events: RefCell<Vec<LogEvent>>,
}

impl MemoryLog {
    pub(crate) fn closes(&self) -> Vec<(String, UnitStatus)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                LogEvent::Close(unit, status) => Some((unit.clone(), *status)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                LogEvent::Line(_, line, _) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }
}

impl LogSink for MemoryLog {
    fn open_stream(&self, unit: &str) {
        self.events
            .borrow_mut()
            .push(LogEvent::Open(unit.to_string()));
    }

    fn append(&self, unit: &str, line: &str, level: LogLevel) {
        self.events
            .borrow_mut()
            .push(LogEvent::Line(unit.to_string(), line.to_string(), level));
    }

    fn close(&self, unit: &str, status: UnitStatus) {
        self.events
            .borrow_mut()
            .push(LogEvent::Close(unit.to_string(), status));
    }
}

/// File store keyed by the display form of a scoped path.
#[derive(Default)]
pub(crate) struct MemoryFiles {
    pub(crate) nodes: BTreeMap<String, FileStoreNode>,
}

impl MemoryFiles {
    pub(crate) fn file(mut self, path: &str, content: &str) -> Self {
        self.nodes.insert(
            path.to_string(),
            FileStoreNode::File {
                content: content.to_string(),
            },
        );
        self
    }

    pub(crate) fn folder(mut self, path: &str) -> Self {
        self.nodes.insert(path.to_string(), FileStoreNode::Folder);
        self
    }
}

impl FileStore for MemoryFiles {
    fn get(&self, _scope: &ScopeContext, path: &ScopedPath) -> Result<Option<FileStoreNode>> {
        Ok(self.nodes.get(&path.to_string()).cloned())
    }
}

/// File store whose every lookup fails.
pub(crate) struct BrokenFiles;

impl FileStore for BrokenFiles {
    fn get(&self, _scope: &ScopeContext, path: &ScopedPath) -> Result<Option<FileStoreNode>> {
        Err(EngineError::invalid_store(path.to_string(), "file store unavailable"))
    }
}

pub(crate) fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(crate) fn git(provider: GitProvider, connector_ref: &str, paths: &[&str]) -> StoreConfig {
    StoreConfig::VersionControl(GitStore {
        provider,
        connector_ref: connector_ref.to_string(),
        fetch_type: GitFetchType::Branch,
        branch_or_commit: "main".to_string(),
        paths: strings(paths),
        folder_path: None,
        repo_name: None,
    })
}

pub(crate) fn git_folder(provider: GitProvider, connector_ref: &str, folder: &str) -> StoreConfig {
    StoreConfig::VersionControl(GitStore {
        provider,
        connector_ref: connector_ref.to_string(),
        fetch_type: GitFetchType::Commit,
        branch_or_commit: "4f2a9c1".to_string(),
        paths: Vec::new(),
        folder_path: Some(folder.to_string()),
        repo_name: None,
    })
}

pub(crate) fn inline(content: &str) -> StoreConfig {
    StoreConfig::Inline(InlineStore {
        content: content.to_string(),
    })
}

pub(crate) fn script(file_path: &str) -> StoreConfig {
    StoreConfig::ScriptRemote(ScriptStore {
        script: "./render-values.sh".to_string(),
        file_path: file_path.to_string(),
        delegate_selectors: vec!["build-pool".to_string()],
    })
}

pub(crate) fn file_store(paths: &[&str]) -> StoreConfig {
    StoreConfig::InternalFileStore(FileStoreRef {
        scoped_paths: strings(paths),
    })
}

pub(crate) fn inherit(paths: &[&str]) -> StoreConfig {
    StoreConfig::InheritFromManifest(InheritStore {
        paths: strings(paths),
    })
}

pub(crate) fn http_repo(connector_ref: &str) -> StoreConfig {
    StoreConfig::HttpRepo(HttpRepoStore {
        connector_ref: connector_ref.to_string(),
    })
}

pub(crate) fn k8s(identifier: &str, store: StoreConfig, overrides: &[&str]) -> ManifestSpec {
    ManifestSpec {
        identifier: identifier.to_string(),
        ordinal: 0,
        body: ManifestBody::K8sManifest {
            values_override_paths: strings(overrides),
            store,
        },
    }
}

pub(crate) fn helm(
    identifier: &str,
    store: StoreConfig,
    sub_chart_path: Option<&str>,
    overrides: &[&str],
) -> ManifestSpec {
    ManifestSpec {
        identifier: identifier.to_string(),
        ordinal: 0,
        body: ManifestBody::HelmChart {
            chart_name: "api".to_string(),
            chart_version: Some("1.4.2".to_string()),
            values_override_paths: strings(overrides),
            sub_chart_path: sub_chart_path.map(str::to_string),
            command_flags: BTreeMap::new(),
            store,
        },
    }
}

pub(crate) fn kustomize(identifier: &str, store: StoreConfig, patches: &[&str]) -> ManifestSpec {
    ManifestSpec {
        identifier: identifier.to_string(),
        ordinal: 0,
        body: ManifestBody::Kustomize {
            plugin_path: None,
            patches_paths: strings(patches),
            store,
        },
    }
}

pub(crate) fn openshift(identifier: &str, store: StoreConfig, params: &[&str]) -> ManifestSpec {
    ManifestSpec {
        identifier: identifier.to_string(),
        ordinal: 0,
        body: ManifestBody::OpenshiftTemplate {
            params_override_paths: strings(params),
            store,
        },
    }
}

pub(crate) fn values(identifier: &str, ordinal: u32, store: StoreConfig) -> ManifestSpec {
    ManifestSpec {
        identifier: identifier.to_string(),
        ordinal,
        body: ManifestBody::ValuesOverlay { store },
    }
}
