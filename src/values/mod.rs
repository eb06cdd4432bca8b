//! Override aggregation for one apply step.
//!
//! Ordering is a function of declaration order and layer only: the primary's
//! implicit default, then its declared paths, then service overlays, then
//! step-level overrides. The template renderer merges last-write-wins, so
//! later entries take precedence.
mod defaults;

pub use defaults::{default_values_path, join_path, DEFAULT_VALUES_FILE};

use crate::error::{EngineError, Result};
use crate::model::{ManifestKind, ManifestSpec, StoreConfig, StoreKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Suffix for the fetch key of a primary's implicit default values file.
pub const DEFAULT_KEY_SUFFIX: &str = "#default";

/// Precedence layer an override entry belongs to, lowest first.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OverrideLayer {
    ManifestDefault,
    ManifestDeclared,
    Service,
    Step,
}

impl OverrideLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideLayer::ManifestDefault => "manifest_default",
            OverrideLayer::ManifestDeclared => "manifest_declared",
            OverrideLayer::Service => "service",
            OverrideLayer::Step => "step",
        }
    }
}

impl fmt::Display for OverrideLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ordered override source.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    /// Unique fetch key; result maps are keyed by it.
    pub key: String,
    pub manifest_identifier: String,
    pub manifest_kind: ManifestKind,
    pub layer: OverrideLayer,
    pub required_if_missing: bool,
    /// Resolved from an `InheritFromManifest` store.
    #[serde(default)]
    pub inherited: bool,
    /// Effective store; inherited entries carry the primary's store.
    pub store: StoreConfig,
    pub paths: Vec<String>,
}

impl OverrideEntry {
    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Context string used in user-facing messages.
    pub fn context(&self) -> String {
        format!(
            "{} with Id [{}]",
            self.manifest_kind.label(),
            self.manifest_identifier
        )
    }
}

/// Locate the single primary manifest.
pub fn find_primary(manifests: &[ManifestSpec]) -> Result<&ManifestSpec> {
    let primaries: Vec<&ManifestSpec> = manifests
        .iter()
        .filter(|manifest| manifest.kind().is_primary())
        .collect();
    match primaries.as_slice() {
        [primary] => Ok(*primary),
        [] => Err(EngineError::invalid_set("no primary manifest in the manifest set")),
        many => Err(EngineError::invalid_set(format!(
            "multiple primary manifests in the manifest set: {}",
            many.iter()
                .map(|manifest| manifest.identifier.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Build the ordered override list for one apply step.
///
/// An empty input yields an empty list.
pub fn aggregate(
    manifests: &[ManifestSpec],
    step_overrides: &[ManifestSpec],
) -> Result<Vec<OverrideEntry>> {
    if manifests.is_empty() && step_overrides.is_empty() {
        return Ok(Vec::new());
    }
    check_identifiers(manifests.iter().chain(step_overrides))?;
    let primary = find_primary(manifests)?;
    if let Some(step_primary) = step_overrides
        .iter()
        .find(|manifest| manifest.kind().is_primary())
    {
        return Err(EngineError::invalid_set(format!(
            "step-level override [{}] must be a values, params or patches manifest, not {}",
            step_primary.identifier,
            step_primary.kind()
        )));
    }

    let mut entries = Vec::new();
    if let Some(path) = default_values_path(primary) {
        entries.push(primary_entry(
            primary,
            format!("{}{DEFAULT_KEY_SUFFIX}", primary.identifier),
            OverrideLayer::ManifestDefault,
            vec![path],
        ));
    }
    let declared = primary.declared_override_paths();
    match primary.store() {
        StoreConfig::InheritFromManifest(_) => {
            return Err(EngineError::unsupported_store(
                StoreKind::InheritFromManifest,
                primary.context(),
            ));
        }
        StoreConfig::Inline(_) if !declared.is_empty() => {
            return Err(EngineError::invalid_store(
                primary.context(),
                "inline manifests cannot declare override paths",
            ));
        }
        _ => {}
    }
    check_primary_store(primary)?;
    if !declared.is_empty() {
        entries.push(primary_entry(
            primary,
            primary.identifier.clone(),
            OverrideLayer::ManifestDeclared,
            declared.to_vec(),
        ));
    }
    for overlay in in_declaration_order(manifests) {
        entries.push(overlay_entry(primary, overlay, OverrideLayer::Service)?);
    }
    for overlay in in_declaration_order(step_overrides) {
        entries.push(overlay_entry(primary, overlay, OverrideLayer::Step)?);
    }
    Ok(entries)
}

fn check_identifiers<'a>(manifests: impl Iterator<Item = &'a ManifestSpec>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for manifest in manifests {
        let identifier = manifest.identifier.trim();
        if identifier.is_empty() {
            return Err(EngineError::invalid_set(format!(
                "{} manifest has a blank identifier",
                manifest.kind()
            )));
        }
        if identifier.contains('#') {
            return Err(EngineError::invalid_set(format!(
                "manifest identifier [{identifier}] must not contain '#'"
            )));
        }
        if !seen.insert(identifier) {
            return Err(EngineError::invalid_set(format!(
                "duplicate manifest identifier [{identifier}]"
            )));
        }
    }
    Ok(())
}

/// Chart repositories only serve Helm charts; Kustomize needs a file tree.
fn check_primary_store(primary: &ManifestSpec) -> Result<()> {
    let store = primary.store().kind();
    let supported = match primary.kind() {
        ManifestKind::HelmChart => true,
        ManifestKind::Kustomize => {
            matches!(store, StoreKind::VersionControl(_) | StoreKind::InternalFileStore)
        }
        _ => !store.is_chart_repository(),
    };
    if supported {
        return Ok(());
    }
    Err(EngineError::unsupported_manifest(
        primary.kind(),
        format!("{} stored in {store}", primary.context()),
    ))
}

/// Overlays sorted by ordinal; ties keep their input order.
fn in_declaration_order(manifests: &[ManifestSpec]) -> Vec<&ManifestSpec> {
    let mut overlays: Vec<&ManifestSpec> = manifests
        .iter()
        .filter(|manifest| manifest.kind().is_overlay())
        .collect();
    overlays.sort_by_key(|manifest| manifest.ordinal);
    overlays
}

fn primary_entry(
    primary: &ManifestSpec,
    key: String,
    layer: OverrideLayer,
    paths: Vec<String>,
) -> OverrideEntry {
    OverrideEntry {
        key,
        manifest_identifier: primary.identifier.clone(),
        manifest_kind: primary.kind(),
        layer,
        required_if_missing: layer != OverrideLayer::ManifestDefault,
        inherited: false,
        store: primary.store().clone(),
        paths,
    }
}

fn overlay_entry(
    primary: &ManifestSpec,
    overlay: &ManifestSpec,
    layer: OverrideLayer,
) -> Result<OverrideEntry> {
    let context = overlay.context();
    let (store, paths, inherited) = match overlay.store() {
        StoreConfig::InheritFromManifest(inherit) => {
            (inherit_store(primary, &context)?, inherit.paths.clone(), true)
        }
        StoreConfig::VersionControl(git) => (overlay.store().clone(), git.paths.clone(), false),
        StoreConfig::InternalFileStore(files) => {
            (overlay.store().clone(), files.scoped_paths.clone(), false)
        }
        StoreConfig::ScriptRemote(script) => {
            (overlay.store().clone(), vec![script.file_path.clone()], false)
        }
        StoreConfig::Inline(_) => (overlay.store().clone(), Vec::new(), false),
        StoreConfig::HttpRepo(_) | StoreConfig::OciRegistry(_) | StoreConfig::ObjectStore(_) => {
            return Err(EngineError::unsupported_store(overlay.store().kind(), context));
        }
    };
    if paths.iter().any(|path| path.trim().is_empty()) {
        return Err(EngineError::invalid_store(context, "override paths must not be blank"));
    }
    if paths.is_empty() && !matches!(store, StoreConfig::Inline(_)) {
        return Err(EngineError::invalid_store(context, "no override paths declared"));
    }
    Ok(OverrideEntry {
        key: overlay.identifier.clone(),
        manifest_identifier: overlay.identifier.clone(),
        manifest_kind: overlay.kind(),
        layer,
        required_if_missing: true,
        inherited,
        store,
        paths,
    })
}

/// Store an `InheritFromManifest` overlay resolves against.
fn inherit_store(primary: &ManifestSpec, context: &str) -> Result<StoreConfig> {
    match primary.store() {
        StoreConfig::VersionControl(git) => {
            let mut git = git.clone();
            git.paths.clear();
            Ok(StoreConfig::VersionControl(git))
        }
        store
            if store.kind().is_chart_repository() && primary.kind() == ManifestKind::HelmChart =>
        {
            Ok(store.clone())
        }
        store => Err(EngineError::unsupported_store(
            StoreKind::InheritFromManifest,
            format!("{context} (primary manifest store is {})", store.kind()),
        )),
    }
}
