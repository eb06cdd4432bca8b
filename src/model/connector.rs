//! Connectors and decrypted credentials.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Concrete credential type a connector was registered with.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Git,
    Github,
    Gitlab,
    Bitbucket,
    HttpHelm,
    OciHelm,
    Aws,
    Gcp,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 8] = [
        CredentialKind::Git,
        CredentialKind::Github,
        CredentialKind::Gitlab,
        CredentialKind::Bitbucket,
        CredentialKind::HttpHelm,
        CredentialKind::OciHelm,
        CredentialKind::Aws,
        CredentialKind::Gcp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::Git => "git",
            CredentialKind::Github => "github",
            CredentialKind::Gitlab => "gitlab",
            CredentialKind::Bitbucket => "bitbucket",
            CredentialKind::HttpHelm => "http_helm",
            CredentialKind::OciHelm => "oci_helm",
            CredentialKind::Aws => "aws",
            CredentialKind::Gcp => "gcp",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GitConnectionType {
    /// URL points at one repository.
    #[default]
    Repo,
    /// URL points at an account or organization; the repo name comes from the store.
    Account,
}

/// Provider read-API access configured on a git connector.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ApiAccess {
    #[serde(default)]
    pub payload: BTreeMap<String, String>,
    #[serde(default)]
    pub encryption_refs: Vec<String>,
}

/// A stored credential plus its connection metadata.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Connector {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: CredentialKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub connection_type: GitConnectionType,
    /// Field name to value; values listed in `encryption_refs` are secret refs.
    #[serde(default)]
    pub credential_payload: BTreeMap<String, String>,
    #[serde(default)]
    pub encryption_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_access: Option<ApiAccess>,
    /// OCI registries hosted on ECR authenticate through an AWS identity.
    #[serde(default)]
    pub aws_auth: bool,
}

/// Credential fields after secret resolution.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct DecryptedCredential {
    pub fields: BTreeMap<String, String>,
}

impl DecryptedCredential {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

impl fmt::Debug for DecryptedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedCredential")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Account/org/project scope a connector reference is resolved in.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct ScopeContext {
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}
