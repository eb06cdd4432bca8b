//! Engine configuration.
//!
//! Loaded once per invocation from `<workspace>/config.json`, falling back to
//! the user config directory and then to built-in defaults.
use crate::chain::parse_timeout;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_TIMEOUT: &str = "10m";
pub const DEFAULT_FETCH_UNIT: &str = "Fetch Files";

/// Behavior switches resolved once per execution context.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Capabilities {
    /// Attach a provider read-API token to git fetches (never for Kustomize).
    pub optimized_git_fetch: bool,
    /// Accept OCI registry chart sources.
    pub oci_helm_enabled: bool,
    /// Tag Helm repo rounds for AWS-authenticated OCI registries.
    pub oci_ecr_task_variant: bool,
    pub latest_chartmuseum: bool,
    /// Render expressions inside fetched override contents.
    pub render_fetched_contents: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub schema_version: u32,
    #[serde(default = "default_timeout")]
    pub default_timeout: String,
    #[serde(default = "default_fetch_unit")]
    pub fetch_unit_name: String,
    #[serde(default)]
    pub capabilities: Capabilities,
}

fn default_timeout() -> String {
    DEFAULT_TIMEOUT.to_string()
}

fn default_fetch_unit() -> String {
    DEFAULT_FETCH_UNIT.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            default_timeout: default_timeout(),
            fetch_unit_name: default_fetch_unit(),
            capabilities: Capabilities::default(),
        }
    }
}

/// Per-user config location, when the platform has one.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mchain").join("config.json"))
}

pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: EngineConfig =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    validate_config(&config).with_context(|| format!("validate {}", path.display()))?;
    Ok(config)
}

/// Load the first config found among the candidates, else defaults.
pub fn resolve_config(candidates: &[PathBuf]) -> Result<(EngineConfig, Option<PathBuf>)> {
    for path in candidates {
        if path.is_file() {
            return Ok((load_config(path)?, Some(path.clone())));
        }
    }
    Ok((EngineConfig::default(), None))
}

pub fn validate_config(config: &EngineConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.fetch_unit_name.trim().is_empty() {
        return Err(anyhow!("fetch_unit_name must be non-empty"));
    }
    parse_timeout(&config.default_timeout).ok_or_else(|| {
        anyhow!(
            "default_timeout {:?} is not a valid duration",
            config.default_timeout
        )
    })?;
    Ok(())
}
