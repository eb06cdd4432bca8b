//! Round-scoped connector resolution.
//!
//! A `RoundConnectors` lives for exactly one round build and is dropped with
//! it, so a credential rotated between rounds is always picked up.
use super::validate::validate;
use crate::error::{EngineError, Result};
use crate::model::{Connector, DecryptedCredential, ScopeContext, StoreConfig};
use crate::ports::ConnectorService;
use std::collections::BTreeMap;
use tracing::debug;

pub struct RoundConnectors<'a> {
    service: &'a dyn ConnectorService,
    scope: &'a ScopeContext,
    connectors: BTreeMap<String, Connector>,
    credentials: BTreeMap<String, DecryptedCredential>,
    api_tokens: BTreeMap<String, DecryptedCredential>,
}

impl<'a> RoundConnectors<'a> {
    pub fn new(service: &'a dyn ConnectorService, scope: &'a ScopeContext) -> Self {
        Self {
            service,
            scope,
            connectors: BTreeMap::new(),
            credentials: BTreeMap::new(),
            api_tokens: BTreeMap::new(),
        }
    }

    /// Resolve a connector reference, once per round.
    pub fn connector(&mut self, connector_ref: &str, context: &str) -> Result<Connector> {
        if let Some(connector) = self.connectors.get(connector_ref) {
            debug!(connector_ref, "connector cache hit");
            return Ok(connector.clone());
        }
        let connector = self
            .service
            .get_connector(connector_ref, self.scope)?
            .ok_or_else(|| EngineError::ConnectorNotFound {
                connector_ref: connector_ref.to_string(),
                context: context.to_string(),
            })?;
        self.connectors
            .insert(connector_ref.to_string(), connector.clone());
        Ok(connector)
    }

    /// Resolve the store's connector and check its credential kind.
    ///
    /// Returns `None` for stores that do not reference a connector.
    pub fn resolve_for(&mut self, store: &StoreConfig, context: &str) -> Result<Option<Connector>> {
        let Some(connector_ref) = store.connector_ref() else {
            return Ok(None);
        };
        let connector = self.connector(connector_ref, context)?;
        validate(store.kind(), &connector, context)?;
        Ok(Some(connector))
    }

    pub fn credential(&mut self, connector: &Connector) -> Result<DecryptedCredential> {
        if let Some(credential) = self.credentials.get(&connector.id) {
            debug!(connector = %connector.id, "credential cache hit");
            return Ok(credential.clone());
        }
        let credential = self
            .service
            .decrypt(&connector.credential_payload, &connector.encryption_refs)?;
        self.credentials
            .insert(connector.id.clone(), credential.clone());
        Ok(credential)
    }

    /// Decrypted read-API token, when the connector has API access configured.
    pub fn api_token(&mut self, connector: &Connector) -> Result<Option<DecryptedCredential>> {
        let Some(api_access) = connector.api_access.as_ref() else {
            return Ok(None);
        };
        if let Some(token) = self.api_tokens.get(&connector.id) {
            return Ok(Some(token.clone()));
        }
        let token = self
            .service
            .decrypt(&api_access.payload, &api_access.encryption_refs)?;
        self.api_tokens.insert(connector.id.clone(), token.clone());
        Ok(Some(token))
    }
}
