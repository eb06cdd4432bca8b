//! Immutable data model: manifests, stores and connectors.
//!
//! Both `StoreConfig` and `ManifestSpec` are closed tagged unions so every
//! consumer matches them exhaustively.
mod connector;
mod manifest;
mod store;

pub use connector::{
    ApiAccess, Connector, CredentialKind, DecryptedCredential, GitConnectionType, ScopeContext,
};
pub use manifest::{store_kind_of, ManifestBody, ManifestKind, ManifestSpec};
pub use store::{
    is_remote_backend, BucketFlavor, BucketStore, FileStoreRef, GitFetchType, GitProvider,
    GitStore, HttpRepoStore, InheritStore, InlineStore, OciStore, ScriptStore, StoreConfig,
    StoreKind,
};
