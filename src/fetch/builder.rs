//! Turns ordered override entries into remote fetch instructions.
use super::git;
use super::instruction::{
    ChartFetchPayload, ChartSource, FetchInstruction, FetchPayload, GitFetchPayload,
    ScriptFetchPayload,
};
use crate::config::Capabilities;
use crate::connector::RoundConnectors;
use crate::error::{EngineError, Result};
use crate::model::{Connector, ManifestBody, ManifestKind, ManifestSpec, StoreConfig};
use crate::values::OverrideEntry;
use tracing::debug;

/// Builds the instructions of one round. Holds that round's connector cache.
pub struct FetchConfigBuilder<'a> {
    connectors: RoundConnectors<'a>,
    capabilities: Capabilities,
    account_id: &'a str,
}

impl<'a> FetchConfigBuilder<'a> {
    pub fn new(
        connectors: RoundConnectors<'a>,
        capabilities: Capabilities,
        account_id: &'a str,
    ) -> Self {
        Self {
            connectors,
            capabilities,
            account_id,
        }
    }

    /// Build the instruction for one entry of the primary's manifest set.
    pub fn build(
        &mut self,
        entry: &OverrideEntry,
        primary: &ManifestSpec,
    ) -> Result<FetchInstruction> {
        let context = entry.context();
        let payload = match &entry.store {
            StoreConfig::VersionControl(store) => {
                let connector = self.require_connector(entry, &context)?;
                let (repo_url, connection_type) = git::repo_url(&connector, store, &context)?;
                if store.branch_or_commit.trim().is_empty() {
                    return Err(EngineError::invalid_store(
                        context,
                        "branch or commit must be set",
                    ));
                }
                let credential = self.connectors.credential(&connector)?;
                let api_token = if self.optimized_fetch(entry, store.provider.has_read_api()) {
                    self.connectors.api_token(&connector)?
                } else {
                    None
                };
                FetchPayload::VersionControl(GitFetchPayload {
                    provider: store.provider,
                    connector_id: connector.id.clone(),
                    repo_url,
                    connection_type,
                    fetch_type: store.fetch_type,
                    branch_or_commit: store.branch_or_commit.trim().to_string(),
                    manifest_paths: git::manifest_paths(entry.manifest_kind, store),
                    paths: entry.paths.clone(),
                    succeed_if_missing: !entry.required_if_missing,
                    credential,
                    api_token,
                })
            }
            StoreConfig::HttpRepo(_)
            | StoreConfig::OciRegistry(_)
            | StoreConfig::ObjectStore(_) => {
                self.chart_payload(entry, primary, &context)?
            }
            StoreConfig::ScriptRemote(store) => FetchPayload::Script(ScriptFetchPayload {
                account_id: self.account_id.to_string(),
                script: store.script.clone(),
                file_paths: entry.paths.clone(),
                delegate_selectors: store.delegate_selectors.clone(),
            }),
            StoreConfig::Inline(_)
            | StoreConfig::InternalFileStore(_)
            | StoreConfig::InheritFromManifest(_) => {
                return Err(EngineError::unsupported_store(
                    entry.store_kind(),
                    format!("remote fetch of {context}"),
                ));
            }
        };
        debug!(
            key = %entry.key,
            store = %entry.store_kind(),
            paths = entry.paths.len(),
            "built fetch instruction"
        );
        Ok(FetchInstruction {
            identifier: entry.key.clone(),
            manifest_identifier: entry.manifest_identifier.clone(),
            manifest_kind: entry.manifest_kind,
            required_if_missing: entry.required_if_missing,
            payload,
        })
    }

    fn require_connector(&mut self, entry: &OverrideEntry, context: &str) -> Result<Connector> {
        self.connectors
            .resolve_for(&entry.store, context)?
            .ok_or_else(|| EngineError::corruption(format!("{context} has no connector reference")))
    }

    fn optimized_fetch(&self, entry: &OverrideEntry, provider_has_api: bool) -> bool {
        self.capabilities.optimized_git_fetch
            && provider_has_api
            && entry.manifest_kind != ManifestKind::Kustomize
            && entry.manifest_kind != ManifestKind::PatchesOverlay
    }

    fn chart_payload(
        &mut self,
        entry: &OverrideEntry,
        primary: &ManifestSpec,
        context: &str,
    ) -> Result<FetchPayload> {
        let ManifestBody::HelmChart {
            chart_name,
            chart_version,
            sub_chart_path,
            command_flags,
            ..
        } = &primary.body
        else {
            return Err(EngineError::unsupported_manifest(
                primary.kind(),
                format!("{} stored in {}", primary.context(), entry.store_kind()),
            ));
        };
        if matches!(entry.store, StoreConfig::OciRegistry(_)) && !self.capabilities.oci_helm_enabled
        {
            return Err(EngineError::unsupported_store(
                entry.store_kind(),
                format!("{context} (OCI Helm chart sources are disabled)"),
            ));
        }
        let connector = self.require_connector(entry, context)?;
        let source = match &entry.store {
            StoreConfig::HttpRepo(_) => ChartSource::Http {
                repo_url: connector_url(&connector, context)?,
            },
            StoreConfig::OciRegistry(store) => ChartSource::Oci {
                registry_url: connector_url(&connector, context)?,
                base_path: store.base_path.trim().to_string(),
                aws_auth: connector.aws_auth,
            },
            StoreConfig::ObjectStore(store) => {
                if store.bucket.trim().is_empty() {
                    return Err(EngineError::invalid_store(context, "bucket name must be set"));
                }
                ChartSource::Bucket {
                    flavor: store.flavor(),
                    bucket: store.bucket.trim().to_string(),
                    region: store.region.clone(),
                    folder_path: store.folder_path.trim().to_string(),
                    latest_chartmuseum: self.capabilities.latest_chartmuseum,
                }
            }
            other => {
                return Err(EngineError::unsupported_store(other.kind(), context));
            }
        };
        let credential = self.connectors.credential(&connector)?;
        Ok(FetchPayload::ChartRepository(ChartFetchPayload {
            connector_id: connector.id.clone(),
            source,
            chart_name: chart_name.clone(),
            chart_version: chart_version.clone(),
            sub_chart_path: sub_chart_path.clone(),
            paths: entry.paths.clone(),
            succeed_if_missing: !entry.required_if_missing,
            command_flags: command_flags.clone(),
            credential,
        }))
    }
}

fn connector_url(connector: &Connector, context: &str) -> Result<String> {
    connector
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            EngineError::invalid_store(context, format!("connector [{}] has no url", connector.id))
        })
}
