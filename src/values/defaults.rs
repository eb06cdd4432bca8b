//! Implicit default values file per primary manifest.
use crate::model::{ManifestKind, ManifestSpec, StoreConfig};

pub const DEFAULT_VALUES_FILE: &str = "values.yaml";

/// Join a repository-relative base and a relative name.
///
/// Blank, `.` and `/` bases collapse to the bare name.
pub fn join_path(base: &str, name: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let name = name.trim().trim_start_matches('/');
    if base.is_empty() || base == "." {
        return name.to_string();
    }
    if name.is_empty() {
        return base.to_string();
    }
    format!("{base}/{name}")
}

fn values_under(base: &str, sub_chart: Option<&str>) -> String {
    match sub_chart {
        Some(sub_chart) => join_path(&join_path(base, sub_chart), DEFAULT_VALUES_FILE),
        None => join_path(base, DEFAULT_VALUES_FILE),
    }
}

/// Path of the primary's implicit `values.yaml`, if its kind ships one.
///
/// K8s manifests look next to their first declared path, Helm charts under
/// the chart folder (and sub-chart, when set).
pub fn default_values_path(primary: &ManifestSpec) -> Option<String> {
    if !primary.kind().has_default_values() {
        return None;
    }
    let sub_chart = primary.sub_chart_path();
    match primary.store() {
        StoreConfig::VersionControl(git) => {
            let base = if primary.kind() == ManifestKind::HelmChart {
                git.folder_path.as_deref()
            } else {
                git.paths.first().map(String::as_str)
            };
            Some(values_under(base.unwrap_or_default(), sub_chart))
        }
        StoreConfig::HttpRepo(_) | StoreConfig::OciRegistry(_) | StoreConfig::ObjectStore(_) => {
            Some(values_under("", sub_chart))
        }
        StoreConfig::ScriptRemote(script) => Some(values_under(&script.file_path, sub_chart)),
        StoreConfig::InternalFileStore(files) => {
            let first = files.scoped_paths.first()?;
            Some(values_under(first, sub_chart))
        }
        StoreConfig::Inline(_) | StoreConfig::InheritFromManifest(_) => None,
    }
}
