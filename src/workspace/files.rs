//! Internal file store rooted at `file-store/<scope>/`.
use super::WorkspacePaths;
use crate::error::{EngineError, Result};
use crate::model::ScopeContext;
use crate::ports::{FileStore, FileStoreNode, ScopedPath};
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DiskFileStore {
    paths: WorkspacePaths,
}

impl DiskFileStore {
    pub fn new(paths: WorkspacePaths) -> Self {
        Self { paths }
    }

    fn resolve(&self, path: &ScopedPath) -> Result<PathBuf> {
        let relative = Path::new(path.path.trim_start_matches('/'));
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(EngineError::invalid_store(
                path.to_string(),
                "file store references must not leave their scope",
            ));
        }
        Ok(self.paths.file_store_scope_dir(path.scope).join(relative))
    }
}

impl FileStore for DiskFileStore {
    fn get(&self, _scope: &ScopeContext, path: &ScopedPath) -> Result<Option<FileStoreNode>> {
        let target = self.resolve(path)?;
        if target.is_dir() {
            return Ok(Some(FileStoreNode::Folder));
        }
        if !target.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&target).map_err(|err| {
            EngineError::invalid_store(
                path.to_string(),
                format!("read {}: {err}", target.display()),
            )
        })?;
        Ok(Some(FileStoreNode::File { content }))
    }
}
