//! Fetch instructions and the builder that produces them.
mod builder;
pub mod git;
mod instruction;

pub use builder::FetchConfigBuilder;
pub use instruction::{
    ChartFetchPayload, ChartSource, FetchInstruction, FetchPayload, GitFetchPayload,
    ScriptFetchPayload,
};
