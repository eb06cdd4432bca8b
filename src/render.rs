//! Expression rendering over a flat variable map.
//!
//! Expressions take the form `<+name>` where `name` is a dotted key such as
//! `env.name` or `pipeline.variables.branch`.
use crate::error::{EngineError, Result};
use crate::model::{ManifestBody, ManifestSpec, StoreConfig};
use crate::ports::{ExpressionRenderer, RenderMode};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn expression_regex() -> &'static Regex {
    static EXPRESSION: OnceLock<Regex> = OnceLock::new();
    EXPRESSION.get_or_init(|| {
        Regex::new(r"<\+\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*>").expect("regex for expressions")
    })
}

/// Renderer backed by an in-memory map of resolved variables.
#[derive(Debug, Clone, Default)]
pub struct VariableRenderer {
    variables: BTreeMap<String, String>,
}

impl VariableRenderer {
    pub fn new(variables: BTreeMap<String, String>) -> Self {
        Self { variables }
    }
}

impl ExpressionRenderer for VariableRenderer {
    fn render(&self, field: &str, raw: &str, mode: RenderMode) -> Result<String> {
        let regex = expression_regex();
        if mode == RenderMode::Strict {
            if let Some(missing) = regex
                .captures_iter(raw)
                .find(|cap| !self.variables.contains_key(&cap[1]))
            {
                return Err(EngineError::UnresolvedExpression {
                    field: field.to_string(),
                    expression: missing[0].to_string(),
                });
            }
        }
        let rendered = regex.replace_all(raw, |cap: &Captures| {
            self.variables
                .get(&cap[1])
                .cloned()
                .unwrap_or_else(|| cap[0].to_string())
        });
        Ok(rendered.into_owned())
    }
}

/// Render every free-text field of a manifest strictly.
///
/// Inline content is left untouched; it is rendered with fetched contents.
pub fn resolve_manifest(
    manifest: &ManifestSpec,
    renderer: &dyn ExpressionRenderer,
) -> Result<ManifestSpec> {
    let mut resolved = manifest.clone();
    let prefix = manifest.identifier.clone();
    let field = |name: &str| format!("{prefix}.{name}");
    let one = |name: &str, value: &str| renderer.render(&field(name), value, RenderMode::Strict);
    let many = |name: &str, values: &[String]| -> Result<Vec<String>> {
        values.iter().map(|value| one(name, value)).collect()
    };

    match &mut resolved.body {
        ManifestBody::K8sManifest {
            values_override_paths,
            ..
        } => *values_override_paths = many("values_override_paths", values_override_paths)?,
        ManifestBody::HelmChart {
            chart_name,
            chart_version,
            values_override_paths,
            sub_chart_path,
            command_flags,
            ..
        } => {
            *chart_name = one("chart_name", chart_name)?;
            if let Some(version) = chart_version.as_mut() {
                *version = one("chart_version", version)?;
            }
            *values_override_paths = many("values_override_paths", values_override_paths)?;
            if let Some(sub_chart) = sub_chart_path.as_mut() {
                *sub_chart = one("sub_chart_path", sub_chart)?;
            }
            for flag in command_flags.values_mut() {
                *flag = one("command_flags", flag)?;
            }
        }
        ManifestBody::Kustomize {
            plugin_path,
            patches_paths,
            ..
        } => {
            if let Some(plugin) = plugin_path.as_mut() {
                *plugin = one("plugin_path", plugin)?;
            }
            *patches_paths = many("patches_paths", patches_paths)?;
        }
        ManifestBody::OpenshiftTemplate {
            params_override_paths,
            ..
        } => *params_override_paths = many("params_override_paths", params_override_paths)?,
        ManifestBody::ValuesOverlay { .. }
        | ManifestBody::ParamsOverlay { .. }
        | ManifestBody::PatchesOverlay { .. } => {}
    }

    match resolved.store_mut() {
        StoreConfig::VersionControl(git) => {
            git.connector_ref = one("store.connector_ref", &git.connector_ref)?;
            git.branch_or_commit = one("store.branch_or_commit", &git.branch_or_commit)?;
            git.paths = many("store.paths", &git.paths)?;
            if let Some(folder) = git.folder_path.as_mut() {
                *folder = one("store.folder_path", folder)?;
            }
            if let Some(repo) = git.repo_name.as_mut() {
                *repo = one("store.repo_name", repo)?;
            }
        }
        StoreConfig::HttpRepo(http) => {
            http.connector_ref = one("store.connector_ref", &http.connector_ref)?;
        }
        StoreConfig::OciRegistry(oci) => {
            oci.connector_ref = one("store.connector_ref", &oci.connector_ref)?;
            oci.base_path = one("store.base_path", &oci.base_path)?;
        }
        StoreConfig::ObjectStore(bucket) => {
            bucket.connector_ref = one("store.connector_ref", &bucket.connector_ref)?;
            bucket.bucket = one("store.bucket", &bucket.bucket)?;
            bucket.folder_path = one("store.folder_path", &bucket.folder_path)?;
            if let Some(region) = bucket.region.as_mut() {
                *region = one("store.region", region)?;
            }
        }
        StoreConfig::Inline(_) => {}
        StoreConfig::InternalFileStore(files) => {
            files.scoped_paths = many("store.scoped_paths", &files.scoped_paths)?;
        }
        StoreConfig::ScriptRemote(script) => {
            script.script = one("store.script", &script.script)?;
            script.file_path = one("store.file_path", &script.file_path)?;
        }
        StoreConfig::InheritFromManifest(inherit) => {
            inherit.paths = many("store.paths", &inherit.paths)?;
        }
    }
    Ok(resolved)
}
