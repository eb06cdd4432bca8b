//! Serializable pass-through state threaded between rounds.
//!
//! A process that handles round n+1 may not be the one that handled round n,
//! so everything needed to resume lives here. Transitions consume a state and
//! return a new one.
use super::round::{RoundKind, UnitProgress};
use crate::error::{EngineError, Result};
use crate::model::{ManifestSpec, ScopeContext};
use crate::ports::UnitStatus;
use crate::values::OverrideEntry;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::collections::BTreeMap;

pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Fetch key to contents, in the order the serving round returned them.
pub type ResultMap = BTreeMap<String, Vec<String>>;

/// Which result map a round fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSlot {
    Custom,
    VersionControl,
    HelmRepo,
    LocalStore,
}

impl From<RoundKind> for ResultSlot {
    fn from(kind: RoundKind) -> Self {
        match kind {
            RoundKind::Custom => ResultSlot::Custom,
            RoundKind::VersionControl => ResultSlot::VersionControl,
            RoundKind::HelmRepo => ResultSlot::HelmRepo,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ChainState {
    pub schema_version: u32,
    /// SHA-256 over the manifest inputs; guards against edited snapshots.
    pub fingerprint: String,
    pub scope: ScopeContext,
    pub primary: ManifestSpec,
    pub entries: Vec<OverrideEntry>,
    #[serde(default)]
    pub infrastructure: BTreeMap<String, String>,
    pub unit_name: String,
    pub timeout_ms: u64,
    #[serde(default)]
    pub delegate_selectors: Vec<String>,
    #[serde(default)]
    pub custom_results: ResultMap,
    #[serde(default)]
    pub version_control_results: ResultMap,
    #[serde(default)]
    pub helm_repo_results: ResultMap,
    #[serde(default)]
    pub local_store_results: ResultMap,
    /// Whether the next remote round must open the worker's log stream.
    pub open_log_stream: bool,
    /// Whether this engine's own log unit is running.
    pub log_unit_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting: Option<RoundKind>,
    #[serde(default)]
    pub remaining_rounds: Vec<RoundKind>,
    #[serde(default)]
    pub completed_rounds: Vec<RoundKind>,
    #[serde(default)]
    pub unit_progress: Vec<UnitProgress>,
}

/// Inputs covered by the fingerprint.
#[derive(Serialize)]
struct FingerprintInputs<'a> {
    schema_version: u32,
    scope: &'a ScopeContext,
    primary: &'a ManifestSpec,
    entries: &'a [OverrideEntry],
    infrastructure: &'a BTreeMap<String, String>,
    unit_name: &'a str,
    timeout_ms: u64,
    delegate_selectors: &'a [String],
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

impl ChainState {
    pub fn fingerprint_of(&self) -> Result<String> {
        let inputs = FingerprintInputs {
            schema_version: self.schema_version,
            scope: &self.scope,
            primary: &self.primary,
            entries: &self.entries,
            infrastructure: &self.infrastructure,
            unit_name: &self.unit_name,
            timeout_ms: self.timeout_ms,
            delegate_selectors: &self.delegate_selectors,
        };
        let bytes = serde_json::to_vec(&inputs).map_err(|err| {
            EngineError::corruption(format!("serialize fingerprint inputs: {err}"))
        })?;
        Ok(sha256_hex(&bytes))
    }

    /// Stamp the fingerprint after construction.
    pub fn sealed(mut self) -> Result<Self> {
        self.fingerprint = self.fingerprint_of()?;
        Ok(self)
    }

    /// Reject snapshots from another schema or with edited inputs.
    pub fn verify(&self) -> Result<()> {
        if self.schema_version != STATE_SCHEMA_VERSION {
            return Err(EngineError::corruption(format!(
                "unsupported chain state schema_version {}",
                self.schema_version
            )));
        }
        if self.fingerprint != self.fingerprint_of()? {
            return Err(EngineError::corruption(
                "chain state fingerprint does not match its inputs",
            ));
        }
        Ok(())
    }

    /// Every result map with its slot, in round order.
    pub fn all_results(&self) -> [(ResultSlot, &ResultMap); 4] {
        [
            (ResultSlot::Custom, &self.custom_results),
            (ResultSlot::VersionControl, &self.version_control_results),
            (ResultSlot::HelmRepo, &self.helm_repo_results),
            (ResultSlot::LocalStore, &self.local_store_results),
        ]
    }

    /// New state with one round's results recorded.
    pub fn with_results(mut self, slot: ResultSlot, results: ResultMap) -> Self {
        let target = match slot {
            ResultSlot::Custom => &mut self.custom_results,
            ResultSlot::VersionControl => &mut self.version_control_results,
            ResultSlot::HelmRepo => &mut self.helm_repo_results,
            ResultSlot::LocalStore => &mut self.local_store_results,
        };
        target.extend(results);
        self
    }

    /// New state awaiting `round`, with the worker stream opened by it.
    pub fn dispatched(mut self, round: RoundKind) -> Self {
        self.remaining_rounds.retain(|kind| *kind != round);
        self.awaiting = Some(round);
        self.open_log_stream = false;
        self
    }

    pub fn completed(mut self, round: RoundKind) -> Self {
        self.awaiting = None;
        self.completed_rounds.push(round);
        self
    }

    /// Merge worker-reported unit progress, latest status per unit wins.
    pub fn with_progress(mut self, progress: &[UnitProgress]) -> Self {
        for update in progress {
            match self
                .unit_progress
                .iter_mut()
                .find(|unit| unit.unit_name == update.unit_name)
            {
                Some(unit) => unit.status = update.status,
                None => self.unit_progress.push(update.clone()),
            }
        }
        self
    }

    /// Units still reported as running.
    pub fn running_units(&self) -> Vec<String> {
        self.unit_progress
            .iter()
            .filter(|unit| unit.status == UnitStatus::Running)
            .map(|unit| unit.unit_name.clone())
            .collect()
    }
}
