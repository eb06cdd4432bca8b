//! Typed paths into a workspace layout.
//!
//! ```text
//! <root>/config.json            engine configuration (optional)
//! <root>/connectors.json        connector definitions
//! <root>/secrets.json           secret id -> value
//! <root>/variables.json         expression variables
//! <root>/step.json              default apply step
//! <root>/file-store/<scope>/... internal file store
//! <root>/logs/<unit>.jsonl      execution logs
//! <root>/chain/                 state, request and result snapshots
//! ```
use crate::ports::FileScope;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    root: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn connectors_path(&self) -> PathBuf {
        self.root.join("connectors.json")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.root.join("secrets.json")
    }

    pub fn variables_path(&self) -> PathBuf {
        self.root.join("variables.json")
    }

    /// Apply step used when `--step` is not given.
    pub fn step_path(&self) -> PathBuf {
        self.root.join("step.json")
    }

    pub fn file_store_dir(&self) -> PathBuf {
        self.root.join("file-store")
    }

    /// Return the `file-store/<scope>/` directory.
    pub fn file_store_scope_dir(&self, scope: FileScope) -> PathBuf {
        self.file_store_dir().join(scope.as_str())
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Return the `logs/<unit>.jsonl` path; the unit name is slugged.
    pub fn log_path(&self, unit: &str) -> PathBuf {
        self.logs_dir().join(format!("{}.jsonl", unit_slug(unit)))
    }

    pub fn chain_dir(&self) -> PathBuf {
        self.root.join("chain")
    }

    pub fn state_path(&self) -> PathBuf {
        self.chain_dir().join("state.json")
    }

    pub fn request_path(&self) -> PathBuf {
        self.chain_dir().join("request.json")
    }

    pub fn result_path(&self) -> PathBuf {
        self.chain_dir().join("result.json")
    }
}

fn unit_slug(unit: &str) -> String {
    let slug: String = unit
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "unit".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_paths_are_slugged_unit_names() {
        let paths = WorkspacePaths::new(PathBuf::from("/ws"));
        assert_eq!(
            paths.log_path("Fetch Files"),
            PathBuf::from("/ws/logs/fetch-files.jsonl")
        );
        assert_eq!(
            paths.log_path("  Git / Fetch  "),
            PathBuf::from("/ws/logs/git-fetch.jsonl")
        );
        assert_eq!(paths.log_path("!!"), PathBuf::from("/ws/logs/unit.jsonl"));
        assert_eq!(
            paths.file_store_scope_dir(FileScope::Org),
            PathBuf::from("/ws/file-store/org")
        );
    }
}
