//! Store configurations: where a manifest or override file lives.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend a manifest is fetched from. The tag fixes which fields exist.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    VersionControl(GitStore),
    HttpRepo(HttpRepoStore),
    OciRegistry(OciStore),
    ObjectStore(BucketStore),
    Inline(InlineStore),
    InternalFileStore(FileStoreRef),
    ScriptRemote(ScriptStore),
    InheritFromManifest(InheritStore),
}

/// Git-family repository location.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GitStore {
    #[serde(default)]
    pub provider: GitProvider,
    pub connector_ref: String,
    #[serde(default)]
    pub fetch_type: GitFetchType,
    pub branch_or_commit: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HttpRepoStore {
    pub connector_ref: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct OciStore {
    pub connector_ref: String,
    #[serde(default)]
    pub base_path: String,
}

/// S3 or GCS bucket; a region is only meaningful for S3.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct BucketStore {
    pub connector_ref: String,
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub folder_path: String,
}

impl BucketStore {
    pub fn flavor(&self) -> BucketFlavor {
        if self.region.is_some() {
            BucketFlavor::S3
        } else {
            BucketFlavor::Gcs
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct InlineStore {
    pub content: String,
}

/// Scoped references into the internal file store (`account:/x`, `org:/x`, `/x`).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FileStoreRef {
    pub scoped_paths: Vec<String>,
}

/// Source produced by running a script on the worker.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ScriptStore {
    pub script: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delegate_selectors: Vec<String>,
}

/// Override paths read from the primary manifest's own store.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct InheritStore {
    pub paths: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum GitProvider {
    #[default]
    Git,
    Github,
    Gitlab,
    Bitbucket,
}

impl GitProvider {
    /// Human-readable provider name used in connector guidance.
    pub fn display_name(&self) -> &'static str {
        match self {
            GitProvider::Git => "Git",
            GitProvider::Github => "Github",
            GitProvider::Gitlab => "GitLab",
            GitProvider::Bitbucket => "Bitbucket",
        }
    }

    /// Providers with a read API usable instead of a clone.
    pub fn has_read_api(&self) -> bool {
        !matches!(self, GitProvider::Git)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GitFetchType {
    #[default]
    Branch,
    Commit,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BucketFlavor {
    S3,
    Gcs,
}

/// Discriminant of [`StoreConfig`], carrying the sub-kind where one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    VersionControl(GitProvider),
    HttpRepo,
    OciRegistry,
    ObjectStore(BucketFlavor),
    Inline,
    InternalFileStore,
    ScriptRemote,
    InheritFromManifest,
}

impl StoreKind {
    /// Return the stable string identifier used in messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::VersionControl(GitProvider::Git) => "Git",
            StoreKind::VersionControl(GitProvider::Github) => "Github",
            StoreKind::VersionControl(GitProvider::Gitlab) => "GitLab",
            StoreKind::VersionControl(GitProvider::Bitbucket) => "Bitbucket",
            StoreKind::HttpRepo => "Http",
            StoreKind::OciRegistry => "OciHelmChart",
            StoreKind::ObjectStore(BucketFlavor::S3) => "S3",
            StoreKind::ObjectStore(BucketFlavor::Gcs) => "Gcs",
            StoreKind::Inline => "Inline",
            StoreKind::InternalFileStore => "FileStore",
            StoreKind::ScriptRemote => "CustomRemote",
            StoreKind::InheritFromManifest => "InheritFromManifest",
        }
    }

    /// Chart repositories: backends that serve a packaged Helm chart.
    pub fn is_chart_repository(&self) -> bool {
        matches!(
            self,
            StoreKind::HttpRepo | StoreKind::OciRegistry | StoreKind::ObjectStore(_)
        )
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StoreConfig {
    pub fn kind(&self) -> StoreKind {
        match self {
            StoreConfig::VersionControl(git) => StoreKind::VersionControl(git.provider),
            StoreConfig::HttpRepo(_) => StoreKind::HttpRepo,
            StoreConfig::OciRegistry(_) => StoreKind::OciRegistry,
            StoreConfig::ObjectStore(bucket) => StoreKind::ObjectStore(bucket.flavor()),
            StoreConfig::Inline(_) => StoreKind::Inline,
            StoreConfig::InternalFileStore(_) => StoreKind::InternalFileStore,
            StoreConfig::ScriptRemote(_) => StoreKind::ScriptRemote,
            StoreConfig::InheritFromManifest(_) => StoreKind::InheritFromManifest,
        }
    }

    /// Connector reference for backends that authenticate through one.
    pub fn connector_ref(&self) -> Option<&str> {
        match self {
            StoreConfig::VersionControl(git) => Some(&git.connector_ref),
            StoreConfig::HttpRepo(http) => Some(&http.connector_ref),
            StoreConfig::OciRegistry(oci) => Some(&oci.connector_ref),
            StoreConfig::ObjectStore(bucket) => Some(&bucket.connector_ref),
            StoreConfig::Inline(_)
            | StoreConfig::InternalFileStore(_)
            | StoreConfig::ScriptRemote(_)
            | StoreConfig::InheritFromManifest(_) => None,
        }
    }
}

/// Whether a store kind is served by a worker round rather than in-process.
pub fn is_remote_backend(kind: StoreKind) -> bool {
    match kind {
        StoreKind::VersionControl(_)
        | StoreKind::HttpRepo
        | StoreKind::OciRegistry
        | StoreKind::ObjectStore(_)
        | StoreKind::ScriptRemote
        | StoreKind::InheritFromManifest => true,
        StoreKind::Inline | StoreKind::InternalFileStore => false,
    }
}
