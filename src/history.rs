//! Recently used definition roots.
//!
//! One absolute path per line, most recent first, at most
//! `MAX_HISTORY_ENTRIES` lines. A missing file is an empty history. Every
//! mutation rewrites the whole file.

use crate::error::{CatalogError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const MAX_HISTORY_ENTRIES: usize = 10;

#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
    entries: Vec<PathBuf>,
}

impl History {
    pub fn load(path: &Path) -> Result<Self> {
        let entries = match fs::read_to_string(path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .take(MAX_HISTORY_ENTRIES)
                .collect(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(CatalogError::io(
                    format!("reading history {}", path.display()),
                    err,
                ));
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Most recent root that still exists as a directory.
    pub fn last_existing(&self) -> Option<&Path> {
        self.entries
            .first()
            .map(PathBuf::as_path)
            .filter(|path| path.is_dir())
    }

    /// Move `root` to the front, trimming the tail past the cap.
    pub fn record(&mut self, root: &Path) -> Result<()> {
        self.entries.retain(|entry| entry != root);
        self.entries.insert(0, root.to_path_buf());
        self.entries.truncate(MAX_HISTORY_ENTRIES);
        self.persist()
    }

    pub fn remove(&mut self, roots: &[PathBuf]) -> Result<()> {
        self.entries.retain(|entry| !roots.contains(entry));
        self.persist()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| CatalogError::io(format!("creating {}", parent.display()), err))?;
        }
        let mut text = self
            .entries
            .iter()
            .map(|entry| entry.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        fs::write(&self.path, text)
            .map_err(|err| CatalogError::io(format!("writing history {}", self.path.display()), err))
    }
}
