//! Credential kind checks per store kind.
use crate::error::{EngineError, Result};
use crate::model::{BucketFlavor, Connector, CredentialKind, GitProvider, StoreKind};

/// The one credential kind a store kind accepts, with its display name.
///
/// `None` for kinds that take no connector.
pub fn required_credential(kind: StoreKind) -> Option<(CredentialKind, &'static str)> {
    match kind {
        StoreKind::VersionControl(provider) => {
            let credential = match provider {
                GitProvider::Git => CredentialKind::Git,
                GitProvider::Github => CredentialKind::Github,
                GitProvider::Gitlab => CredentialKind::Gitlab,
                GitProvider::Bitbucket => CredentialKind::Bitbucket,
            };
            Some((credential, provider.display_name()))
        }
        StoreKind::HttpRepo => Some((CredentialKind::HttpHelm, "Http Helm")),
        StoreKind::OciRegistry => Some((CredentialKind::OciHelm, "Oci Helm")),
        StoreKind::ObjectStore(BucketFlavor::S3) => {
            Some((CredentialKind::Aws, "Amazon Web Services"))
        }
        StoreKind::ObjectStore(BucketFlavor::Gcs) => Some((CredentialKind::Gcp, "Google cloud")),
        StoreKind::ScriptRemote
        | StoreKind::Inline
        | StoreKind::InternalFileStore
        | StoreKind::InheritFromManifest => None,
    }
}

/// Check a resolved connector against the store kind that references it.
pub fn validate(kind: StoreKind, connector: &Connector, context: &str) -> Result<()> {
    let Some((expected, name)) = required_credential(kind) else {
        return Ok(());
    };
    if connector.kind != expected {
        return Err(EngineError::mismatch(context, name));
    }
    Ok(())
}
