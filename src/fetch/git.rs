//! Git URL and path helpers.
use crate::error::{EngineError, Result};
use crate::model::{Connector, GitConnectionType, GitStore, ManifestKind};

/// Repository URL for a fetch, rewriting account-level connectors.
///
/// Account connectors carry an organization URL; the repo name comes from
/// the store and the result is always repo-scoped.
pub fn repo_url(
    connector: &Connector,
    store: &GitStore,
    context: &str,
) -> Result<(String, GitConnectionType)> {
    let url = connector
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            EngineError::invalid_store(
                context,
                format!("git connector [{}] has no url", connector.id),
            )
        })?;
    match connector.connection_type {
        GitConnectionType::Repo => Ok((url.to_string(), GitConnectionType::Repo)),
        GitConnectionType::Account => {
            let repo_name = store
                .repo_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    EngineError::invalid_store(
                        context,
                        "Repo name cannot be empty for Account level git connector",
                    )
                })?;
            let url = format!(
                "{}/{}",
                url.trim_end_matches('/'),
                repo_name.trim_start_matches('/')
            );
            Ok((url, GitConnectionType::Repo))
        }
    }
}

/// Location of the manifest itself inside the repository.
pub fn manifest_paths(kind: ManifestKind, store: &GitStore) -> Vec<String> {
    match kind {
        ManifestKind::HelmChart => vec![store.folder_path.clone().unwrap_or_default()],
        ManifestKind::Kustomize => vec!["/".to_string()],
        ManifestKind::K8sManifest
        | ManifestKind::OpenshiftTemplate
        | ManifestKind::ValuesOverlay
        | ManifestKind::ParamsOverlay
        | ManifestKind::PatchesOverlay => store.paths.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CredentialKind, GitFetchType, GitProvider};
    use crate::testing::connector;

    fn store(repo_name: Option<&str>) -> GitStore {
        GitStore {
            provider: GitProvider::Git,
            connector_ref: "git".to_string(),
            fetch_type: GitFetchType::Branch,
            branch_or_commit: "main".to_string(),
            paths: vec!["k8s".to_string()],
            folder_path: Some("charts/api".to_string()),
            repo_name: repo_name.map(str::to_string),
        }
    }

    #[test]
    fn account_connector_url_gains_repo_name() {
        let mut account = connector("git", CredentialKind::Git);
        account.url = Some("https://git.example.com/acme/".to_string());
        account.connection_type = GitConnectionType::Account;
        let (url, connection) =
            repo_url(&account, &store(Some("/deploy-config")), "ctx").expect("account url");
        assert_eq!(url, "https://git.example.com/acme/deploy-config");
        assert_eq!(connection, GitConnectionType::Repo);

        let err = repo_url(&account, &store(Some("  ")), "ctx").expect_err("blank repo");
        assert!(err
            .to_string()
            .contains("Repo name cannot be empty for Account level git connector"));
    }

    #[test]
    fn manifest_paths_depend_on_kind() {
        let store = store(None);
        assert_eq!(
            manifest_paths(ManifestKind::HelmChart, &store),
            vec!["charts/api".to_string()]
        );
        assert_eq!(
            manifest_paths(ManifestKind::Kustomize, &store),
            vec!["/".to_string()]
        );
        assert_eq!(
            manifest_paths(ManifestKind::K8sManifest, &store),
            vec!["k8s".to_string()]
        );
    }
}
