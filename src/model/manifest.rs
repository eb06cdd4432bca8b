//! Manifest specifications presented to one apply step.
use super::store::{StoreConfig, StoreKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One manifest in the set an apply step consumes.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ManifestSpec {
    pub identifier: String,
    /// Declaration order within the service definition.
    #[serde(default)]
    pub ordinal: u32,
    #[serde(flatten)]
    pub body: ManifestBody,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManifestBody {
    K8sManifest {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        values_override_paths: Vec<String>,
        store: StoreConfig,
    },
    HelmChart {
        chart_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chart_version: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        values_override_paths: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sub_chart_path: Option<String>,
        /// Helm sub-command name mapped to extra flags for it.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        command_flags: BTreeMap<String, String>,
        store: StoreConfig,
    },
    Kustomize {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plugin_path: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        patches_paths: Vec<String>,
        store: StoreConfig,
    },
    OpenshiftTemplate {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        params_override_paths: Vec<String>,
        store: StoreConfig,
    },
    ValuesOverlay {
        store: StoreConfig,
    },
    ParamsOverlay {
        store: StoreConfig,
    },
    PatchesOverlay {
        store: StoreConfig,
    },
}

/// Discriminant of [`ManifestBody`].
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    K8sManifest,
    HelmChart,
    Kustomize,
    OpenshiftTemplate,
    ValuesOverlay,
    ParamsOverlay,
    PatchesOverlay,
}

impl ManifestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestKind::K8sManifest => "K8sManifest",
            ManifestKind::HelmChart => "HelmChart",
            ManifestKind::Kustomize => "Kustomize",
            ManifestKind::OpenshiftTemplate => "OpenshiftTemplate",
            ManifestKind::ValuesOverlay => "Values",
            ManifestKind::ParamsOverlay => "OpenshiftParam",
            ManifestKind::PatchesOverlay => "KustomizePatches",
        }
    }

    /// Label used when naming a manifest in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            ManifestKind::K8sManifest => "K8s Manifest",
            ManifestKind::HelmChart => "Helm Chart",
            ManifestKind::Kustomize => "Kustomize",
            ManifestKind::OpenshiftTemplate => "Openshift Template",
            ManifestKind::ValuesOverlay => "Values YAML",
            ManifestKind::ParamsOverlay => "Openshift Param",
            ManifestKind::PatchesOverlay => "Kustomize Patches",
        }
    }

    pub fn is_overlay(&self) -> bool {
        matches!(
            self,
            ManifestKind::ValuesOverlay | ManifestKind::ParamsOverlay | ManifestKind::PatchesOverlay
        )
    }

    pub fn is_primary(&self) -> bool {
        !self.is_overlay()
    }

    /// Primaries that ship an implicit `values.yaml` next to their templates.
    pub fn has_default_values(&self) -> bool {
        matches!(self, ManifestKind::K8sManifest | ManifestKind::HelmChart)
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ManifestSpec {
    pub fn kind(&self) -> ManifestKind {
        match &self.body {
            ManifestBody::K8sManifest { .. } => ManifestKind::K8sManifest,
            ManifestBody::HelmChart { .. } => ManifestKind::HelmChart,
            ManifestBody::Kustomize { .. } => ManifestKind::Kustomize,
            ManifestBody::OpenshiftTemplate { .. } => ManifestKind::OpenshiftTemplate,
            ManifestBody::ValuesOverlay { .. } => ManifestKind::ValuesOverlay,
            ManifestBody::ParamsOverlay { .. } => ManifestKind::ParamsOverlay,
            ManifestBody::PatchesOverlay { .. } => ManifestKind::PatchesOverlay,
        }
    }

    pub fn store(&self) -> &StoreConfig {
        match &self.body {
            ManifestBody::K8sManifest { store, .. }
            | ManifestBody::HelmChart { store, .. }
            | ManifestBody::Kustomize { store, .. }
            | ManifestBody::OpenshiftTemplate { store, .. }
            | ManifestBody::ValuesOverlay { store }
            | ManifestBody::ParamsOverlay { store }
            | ManifestBody::PatchesOverlay { store } => store,
        }
    }

    pub(crate) fn store_mut(&mut self) -> &mut StoreConfig {
        match &mut self.body {
            ManifestBody::K8sManifest { store, .. }
            | ManifestBody::HelmChart { store, .. }
            | ManifestBody::Kustomize { store, .. }
            | ManifestBody::OpenshiftTemplate { store, .. }
            | ManifestBody::ValuesOverlay { store }
            | ManifestBody::ParamsOverlay { store }
            | ManifestBody::PatchesOverlay { store } => store,
        }
    }

    /// Override paths a primary declares against its own store.
    pub fn declared_override_paths(&self) -> &[String] {
        match &self.body {
            ManifestBody::K8sManifest {
                values_override_paths,
                ..
            }
            | ManifestBody::HelmChart {
                values_override_paths,
                ..
            } => values_override_paths,
            ManifestBody::Kustomize { patches_paths, .. } => patches_paths,
            ManifestBody::OpenshiftTemplate {
                params_override_paths,
                ..
            } => params_override_paths,
            ManifestBody::ValuesOverlay { .. }
            | ManifestBody::ParamsOverlay { .. }
            | ManifestBody::PatchesOverlay { .. } => &[],
        }
    }

    pub fn sub_chart_path(&self) -> Option<&str> {
        match &self.body {
            ManifestBody::HelmChart { sub_chart_path, .. } => sub_chart_path
                .as_deref()
                .map(str::trim)
                .filter(|path| !path.is_empty()),
            _ => None,
        }
    }

    /// `"<label> with Id [<identifier>]"`, the context used in connector errors.
    pub fn context(&self) -> String {
        format!("{} with Id [{}]", self.kind().label(), self.identifier)
    }
}

/// Store kind a manifest is fetched from.
pub fn store_kind_of(manifest: &ManifestSpec) -> StoreKind {
    manifest.store().kind()
}
