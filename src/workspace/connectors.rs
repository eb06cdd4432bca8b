//! Connector service backed by `connectors.json` and `secrets.json`.
use crate::error::{EngineError, Result};
use crate::model::{Connector, DecryptedCredential, ScopeContext};
use crate::ports::ConnectorService;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// On-disk shape of `connectors.json`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ConnectorsFile {
    #[serde(default)]
    pub connectors: Vec<Connector>,
}

/// Connectors keyed by id; encrypted fields name entries of the secrets map.
#[derive(Clone, Default)]
pub struct FileConnectors {
    connectors: BTreeMap<String, Connector>,
    secrets: BTreeMap<String, String>,
}

impl FileConnectors {
    pub fn new(file: ConnectorsFile, secrets: BTreeMap<String, String>) -> Self {
        Self {
            connectors: file
                .connectors
                .into_iter()
                .map(|connector| (connector.id.clone(), connector))
                .collect(),
            secrets,
        }
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl fmt::Debug for FileConnectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileConnectors")
            .field("connectors", &self.connectors.keys().collect::<Vec<_>>())
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

/// Strip an `account.` or `org.` scope qualifier from a reference.
fn bare_ref(connector_ref: &str) -> &str {
    let trimmed = connector_ref.trim();
    trimmed
        .strip_prefix("account.")
        .or_else(|| trimmed.strip_prefix("org."))
        .unwrap_or(trimmed)
}

impl ConnectorService for FileConnectors {
    fn get_connector(
        &self,
        connector_ref: &str,
        scope: &ScopeContext,
    ) -> Result<Option<Connector>> {
        let id = bare_ref(connector_ref);
        debug!(connector = id, account = %scope.account_id, "connector lookup");
        Ok(self.connectors.get(id).cloned())
    }

    fn decrypt(
        &self,
        payload: &BTreeMap<String, String>,
        encryption_refs: &[String],
    ) -> Result<DecryptedCredential> {
        let mut fields = BTreeMap::new();
        for (field, value) in payload {
            let value = if encryption_refs.contains(field) {
                self.secrets.get(value).cloned().ok_or_else(|| {
                    EngineError::invalid_store(
                        format!("credential field [{field}]"),
                        format!("secret [{value}] not found"),
                    )
                })?
            } else {
                value.clone()
            };
            fields.insert(field.clone(), value);
        }
        Ok(DecryptedCredential { fields })
    }
}
