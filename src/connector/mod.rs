//! Connector validation and round-scoped resolution.
mod cache;
mod validate;

pub use cache::RoundConnectors;
pub use validate::{required_credential, validate};
