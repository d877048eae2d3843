//! Temporary directories that bundle several definitions into one path.
//!
//! The scanner takes a single template path, so a batch run copies the
//! selected backing files into a fresh directory, keeping each relative name
//! so that equal file names from different subdirectories cannot collide.
//! At most one workspace is live: staging a new one deletes the previous one
//! first, and `purge` (or dropping the owner) deletes whatever is left.

use crate::error::{CatalogError, Result};
use crate::record::Record;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::{info, warn};

const WORKSPACE_PREFIX: &str = "pocdex-batch-";

#[derive(Debug)]
pub struct BatchWorkspaces {
    parent: PathBuf,
    current: Option<TempDir>,
}

impl BatchWorkspaces {
    /// Workspaces will be created under `parent`.
    pub fn new(parent: PathBuf) -> Self {
        Self {
            parent,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_ref().map(TempDir::path)
    }

    /// Copy `records` into a new workspace and make it current.
    pub fn stage<'a, I>(&mut self, records: I) -> Result<&Path>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        self.evict();

        fs::create_dir_all(&self.parent).map_err(|err| {
            CatalogError::io(format!("creating {}", self.parent.display()), err)
        })?;
        let dir = Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.parent)
            .map_err(|err| {
                CatalogError::io(format!("creating workspace under {}", self.parent.display()), err)
            })?;

        let mut copied = 0usize;
        for record in records {
            let dest = dir.path().join(&record.relative_name);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|err| {
                    CatalogError::io(format!("creating {}", parent.display()), err)
                })?;
            }
            fs::copy(&record.identity, &dest).map_err(|err| {
                CatalogError::io(
                    format!("copying {} into workspace", record.identity.display()),
                    err,
                )
            })?;
            copied += 1;
        }
        if copied == 0 {
            return Err(CatalogError::validation("no definitions selected for a batch run"));
        }

        info!(path = %dir.path().display(), copied, "staged batch workspace");
        Ok(self.current.insert(dir).path())
    }

    /// Delete every tracked workspace.
    pub fn purge(&mut self) {
        self.evict();
    }

    fn evict(&mut self) {
        if let Some(previous) = self.current.take() {
            let path = previous.path().to_path_buf();
            if let Err(err) = previous.close() {
                warn!(path = %path.display(), error = %err, "failed to remove batch workspace");
            }
        }
    }
}

impl Drop for BatchWorkspaces {
    fn drop(&mut self) {
        self.purge();
    }
}
