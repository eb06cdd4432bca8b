//! Fetch instructions handed to the remote worker.
use crate::model::{
    BucketFlavor, DecryptedCredential, GitConnectionType, GitFetchType, GitProvider, ManifestKind,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One unit of remote work. Immutable once built.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FetchInstruction {
    /// Fetch key the reply's contents are filed under.
    pub identifier: String,
    pub manifest_identifier: String,
    pub manifest_kind: ManifestKind,
    pub required_if_missing: bool,
    pub payload: FetchPayload,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum FetchPayload {
    VersionControl(GitFetchPayload),
    ChartRepository(ChartFetchPayload),
    Script(ScriptFetchPayload),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GitFetchPayload {
    pub provider: GitProvider,
    pub connector_id: String,
    /// Repository URL; account-level connectors are rewritten to repo scope.
    pub repo_url: String,
    pub connection_type: GitConnectionType,
    pub fetch_type: GitFetchType,
    pub branch_or_commit: String,
    /// Where the manifest itself lives (chart folder, kustomize root or paths).
    pub manifest_paths: Vec<String>,
    /// Override files to fetch.
    pub paths: Vec<String>,
    pub succeed_if_missing: bool,
    pub credential: DecryptedCredential,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<DecryptedCredential>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSource {
    Http {
        repo_url: String,
    },
    Oci {
        registry_url: String,
        base_path: String,
        aws_auth: bool,
    },
    Bucket {
        flavor: BucketFlavor,
        bucket: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        folder_path: String,
        latest_chartmuseum: bool,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ChartFetchPayload {
    pub connector_id: String,
    pub source: ChartSource,
    pub chart_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_chart_path: Option<String>,
    /// Values files relative to the unpacked chart.
    pub paths: Vec<String>,
    pub succeed_if_missing: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub command_flags: BTreeMap<String, String>,
    pub credential: DecryptedCredential,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ScriptFetchPayload {
    pub account_id: String,
    pub script: String,
    pub file_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delegate_selectors: Vec<String>,
}

impl FetchInstruction {
    pub fn paths(&self) -> &[String] {
        match &self.payload {
            FetchPayload::VersionControl(git) => &git.paths,
            FetchPayload::ChartRepository(chart) => &chart.paths,
            FetchPayload::Script(script) => &script.file_paths,
        }
    }
}
