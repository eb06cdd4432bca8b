//! Manifest source resolution and fetch-round chaining.
//!
//! Given the manifests attached to a deployment apply step, the engine works
//! out where every override file lives, validates connectors, builds fetch
//! instructions and chains the remote rounds a worker runs, then assembles
//! the override contents in layer order.
pub mod assemble;
pub mod chain;
pub mod cli;
pub mod config;
pub mod connector;
pub mod error;
pub mod fetch;
pub mod model;
pub mod ports;
pub mod render;
pub mod values;
pub mod workflow;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{ApplyStep, ChainFailure, ChainResult, ChainState, Orchestrator};
pub use error::{EngineError, FailureKind};
