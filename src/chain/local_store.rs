//! Synchronous round against the internal file store.
use super::state::ResultMap;
use crate::error::{EngineError, Result};
use crate::model::ScopeContext;
use crate::ports::{FileStore, FileStoreNode, LogLevel, LogSink, ScopedPath};
use crate::values::OverrideEntry;
use tracing::{debug, warn};

pub(crate) struct LocalStoreRound<'a> {
    pub(crate) files: &'a dyn FileStore,
    pub(crate) log: &'a dyn LogSink,
    pub(crate) scope: &'a ScopeContext,
    pub(crate) unit: &'a str,
}

impl LocalStoreRound<'_> {
    /// Fetch every path of every entry; optional entries may come back empty.
    pub(crate) fn run(&self, entries: &[&OverrideEntry]) -> Result<ResultMap> {
        let mut results = ResultMap::new();
        for entry in entries {
            let mut contents = Vec::new();
            for raw in &entry.paths {
                let path = ScopedPath::parse(raw)?;
                self.log.append(
                    self.unit,
                    &format!("Fetching {path} from file store"),
                    LogLevel::Info,
                );
                match self.files.get(self.scope, &path)? {
                    Some(FileStoreNode::File { content }) => {
                        if content.trim().is_empty() {
                            warn!(key = %entry.key, path = %path, "empty file store file");
                            self.log.append(
                                self.unit,
                                &format!("File {path} is empty"),
                                LogLevel::Warn,
                            );
                        }
                        contents.push(content);
                    }
                    Some(FileStoreNode::Folder) => {
                        return Err(EngineError::invalid_store(
                            entry.context(),
                            format!("{path} is a folder, expected a file"),
                        ));
                    }
                    None if entry.required_if_missing => {
                        return Err(EngineError::MissingRequiredPath {
                            identifier: entry.manifest_identifier.clone(),
                            path: path.to_string(),
                            detail: " in file store".to_string(),
                        });
                    }
                    None => {
                        debug!(key = %entry.key, path = %path, "optional file store path absent");
                        self.log.append(
                            self.unit,
                            &format!("{path} not found, continuing without it"),
                            LogLevel::Info,
                        );
                    }
                }
            }
            if !contents.is_empty() {
                results.insert(entry.key.clone(), contents);
            }
        }
        Ok(results)
    }
}
