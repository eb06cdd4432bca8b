//! Shared test infrastructure for integration tests.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const CONNECTORS: &str = r#"{"connectors": [{
    "id": "gh",
    "kind": "github",
    "url": "https://github.com/acme/deploy",
    "credential_payload": {"username": "bot", "password": "gh-password"},
    "encryption_refs": ["password"]
}]}"#;

pub const SECRETS: &str = r#"{"gh-password": "s3cr3t"}"#;

/// K8s manifest in GitHub, a file-store overlay and an inline step override.
pub const STEP: &str = r#"{
    "scope": {"account_id": "acct"},
    "manifests": [
        {
            "identifier": "svc",
            "type": "k8s_manifest",
            "values_override_paths": ["env/prod/values.yaml"],
            "store": {
                "kind": "version_control",
                "provider": "github",
                "connector_ref": "gh",
                "branch_or_commit": "main",
                "paths": ["k8s/app"]
            }
        },
        {
            "identifier": "shared",
            "ordinal": 1,
            "type": "values_overlay",
            "store": {"kind": "internal_file_store", "scoped_paths": ["account:/shared/values.yaml"]}
        }
    ],
    "step_overrides": [
        {"identifier": "step", "type": "values_overlay", "store": {"kind": "inline", "content": "step: 1"}}
    ]
}"#;

/// Temporary workspace driven through the `mchain` binary.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Workspace with connectors, secrets, the step and the shared overlay file.
    pub fn seeded() -> Self {
        let workspace = Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        };
        workspace.write("connectors.json", CONNECTORS);
        workspace.write("secrets.json", SECRETS);
        workspace.write("step.json", STEP);
        workspace.write("file-store/account/shared/values.yaml", "shared: true");
        workspace
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write workspace file");
    }

    pub fn read_json(&self, rel: &str) -> Value {
        let text = fs::read_to_string(self.path(rel)).expect("read workspace file");
        serde_json::from_str(&text).expect("parse workspace json")
    }

    /// Run `mchain <command> --workspace <root> <args...>`.
    pub fn run(&self, command: &str, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_mchain"))
            .arg(command)
            .arg("--workspace")
            .arg(self.root())
            .args(args)
            .env("XDG_CONFIG_HOME", self.path("xdg"))
            .env_remove("MCHAIN_LOG")
            .output()
            .expect("run mchain")
    }
}

pub fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not json ({err}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}
