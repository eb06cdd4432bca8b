//! Decide which rounds a manifest set needs and which entry each serves.
use super::round::RoundKind;
use crate::error::{EngineError, Result};
use crate::model::{ManifestSpec, StoreConfig};
use crate::values::OverrideEntry;
use serde::Serialize;
use std::collections::BTreeMap;

/// Where an entry's contents come from.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "source", content = "round", rename_all = "snake_case")]
pub enum Assignment {
    Remote(RoundKind),
    LocalStore,
    Inline,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RoundPlan {
    /// Remote rounds in dispatch order.
    pub rounds: Vec<RoundKind>,
    /// Fetch key to source.
    pub assignments: BTreeMap<String, Assignment>,
    pub has_local_round: bool,
}

impl RoundPlan {
    /// Entries served by one remote round, in aggregator order.
    pub fn entries_for<'e>(
        &self,
        round: RoundKind,
        entries: &'e [OverrideEntry],
    ) -> Vec<&'e OverrideEntry> {
        self.select(Assignment::Remote(round), entries)
    }

    pub fn local_entries<'e>(&self, entries: &'e [OverrideEntry]) -> Vec<&'e OverrideEntry> {
        self.select(Assignment::LocalStore, entries)
    }

    fn select<'e>(
        &self,
        assignment: Assignment,
        entries: &'e [OverrideEntry],
    ) -> Vec<&'e OverrideEntry> {
        entries
            .iter()
            .filter(|entry| self.assignments.get(&entry.key) == Some(&assignment))
            .collect()
    }
}

/// Plan rounds: custom first, then at most one of version-control or Helm repo.
pub fn plan_rounds(primary: &ManifestSpec, entries: &[OverrideEntry]) -> Result<RoundPlan> {
    let mut assignments = BTreeMap::new();
    let mut first_git: Option<&OverrideEntry> = None;
    let mut has_helm_repo = false;
    for entry in entries {
        let assignment = match &entry.store {
            StoreConfig::ScriptRemote(_) => Assignment::Remote(RoundKind::Custom),
            StoreConfig::VersionControl(_) => {
                if first_git.is_none() {
                    first_git = Some(entry);
                }
                Assignment::Remote(RoundKind::VersionControl)
            }
            StoreConfig::HttpRepo(_)
            | StoreConfig::OciRegistry(_)
            | StoreConfig::ObjectStore(_) => {
                has_helm_repo = true;
                Assignment::Remote(RoundKind::HelmRepo)
            }
            StoreConfig::InternalFileStore(_) => Assignment::LocalStore,
            StoreConfig::Inline(_) => Assignment::Inline,
            StoreConfig::InheritFromManifest(_) => {
                return Err(EngineError::corruption(format!(
                    "entry [{}] still references its primary store",
                    entry.key
                )));
            }
        };
        if assignments.insert(entry.key.clone(), assignment).is_some() {
            return Err(EngineError::corruption(format!(
                "duplicate fetch key [{}]",
                entry.key
            )));
        }
    }
    if let (true, Some(git_entry)) = (has_helm_repo, first_git) {
        return Err(EngineError::MixedRemoteBackends {
            primary: primary.identifier.clone(),
            identifier: git_entry.manifest_identifier.clone(),
        });
    }

    let mut rounds: Vec<RoundKind> = assignments
        .values()
        .filter_map(|assignment| match assignment {
            Assignment::Remote(round) => Some(*round),
            Assignment::LocalStore | Assignment::Inline => None,
        })
        .collect();
    rounds.sort();
    rounds.dedup();
    let has_local_round = assignments
        .values()
        .any(|assignment| *assignment == Assignment::LocalStore);
    Ok(RoundPlan {
        rounds,
        assignments,
        has_local_round,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GitProvider;
    use crate::testing::{file_store, git, helm, http_repo, inline, k8s, script, values};
    use crate::values::aggregate;

    #[test]
    fn custom_round_precedes_version_control() {
        let primary = k8s("svc", git(GitProvider::Git, "git", &["k8s"]), &[]);
        let set = vec![
            primary.clone(),
            values("git-values", 1, git(GitProvider::Git, "git", &["prod.yaml"])),
            values("script-values", 2, script("out/values.yaml")),
            values("local", 3, file_store(&["/svc/values.yaml"])),
            values("inline", 4, inline("a: 1")),
        ];
        let entries = aggregate(&set, &[]).expect("aggregate");
        let plan = plan_rounds(&primary, &entries).expect("plan");
        assert_eq!(plan.rounds, vec![RoundKind::Custom, RoundKind::VersionControl]);
        assert!(plan.has_local_round);
        let custom: Vec<&str> = plan
            .entries_for(RoundKind::Custom, &entries)
            .into_iter()
            .map(|entry| entry.key.as_str())
            .collect();
        assert_eq!(custom, vec!["script-values"]);
        assert_eq!(plan.assignments.get("inline"), Some(&Assignment::Inline));
    }

    #[test]
    fn chart_repo_primary_with_git_overlay_is_rejected() {
        let primary = helm("api", http_repo("helm"), None, &[]);
        let set = vec![
            primary.clone(),
            values("git-values", 1, git(GitProvider::Git, "git", &["prod.yaml"])),
        ];
        let entries = aggregate(&set, &[]).expect("aggregate");
        let err = plan_rounds(&primary, &entries).expect_err("mixed");
        assert_eq!(
            err,
            EngineError::MixedRemoteBackends {
                primary: "api".to_string(),
                identifier: "git-values".to_string(),
            }
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn inline_only_set_needs_no_remote_round() {
        let primary = k8s("svc", inline("kind: ConfigMap"), &[]);
        let set = vec![primary.clone(), values("vals", 1, inline("a: 1"))];
        let entries = aggregate(&set, &[]).expect("aggregate");
        let plan = plan_rounds(&primary, &entries).expect("plan");
        assert!(plan.rounds.is_empty());
        assert!(!plan.has_local_round);
    }
}
