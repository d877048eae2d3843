//! Save and delete against backing files and the in-memory catalog.
//!
//! Save checks run in a fixed order and each one stops the operation: parse,
//! duplicate name, duplicate content, then the write itself. The file is
//! written through a temporary sibling and renamed into place, so a failed
//! write leaves neither a torn file nor a catalog change behind.
//!
//! Delete removes the file first and the record second. If the process dies
//! between the two steps the catalog still lists a record whose file is gone;
//! a reload repairs that.

use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::record::{
    DEFINITION_EXTENSION, Definition, Record, content_hash, display_relative,
    has_definition_extension,
};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Where a save lands.
#[derive(Clone, Copy, Debug)]
pub enum SaveTarget<'a> {
    /// A new file under the root; the extension is appended when missing.
    New(&'a str),
    /// Overwrite the record with this identity, keeping its relative name.
    Existing(&'a Path),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Saved {
    pub identity: PathBuf,
    pub relative_name: PathBuf,
    pub created: bool,
}

/// Caller-side confirmation hook for deletes.
pub trait ConfirmDelete {
    fn confirm(&self, record: &Record) -> bool;
}

impl<F> ConfirmDelete for F
where
    F: Fn(&Record) -> bool,
{
    fn confirm(&self, record: &Record) -> bool {
        self(record)
    }
}

#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted(Record),
    Declined,
}

pub fn save(catalog: &mut Catalog, content: &str, target: SaveTarget<'_>) -> Result<Saved> {
    let root = catalog
        .root()
        .map(Path::to_path_buf)
        .ok_or_else(|| CatalogError::validation("no definition root is loaded"))?;

    let (relative_name, identity, created) = match target {
        SaveTarget::Existing(identity) => {
            let record = catalog.get(identity).ok_or_else(|| {
                CatalogError::validation(format!("no definition at {}", identity.display()))
            })?;
            (record.relative_name.clone(), record.identity.clone(), false)
        }
        SaveTarget::New(name) => {
            let relative_name = normalize_new_name(name)?;
            let identity = root.join(&relative_name);
            (relative_name, identity, true)
        }
    };
    let display = display_relative(&relative_name);

    let definition = Definition::parse(content, &display)?;

    let name_taken = catalog.records().iter().any(|record| {
        record.relative_name == relative_name && (created || record.identity != identity)
    });
    if name_taken || (created && identity.exists()) {
        return Err(CatalogError::DuplicateName { name: display });
    }

    let hash = content_hash(content);
    if let Some(existing) = catalog
        .records()
        .iter()
        .find(|record| record.relative_name != relative_name && record.content_hash() == hash)
    {
        return Err(CatalogError::DuplicateContent {
            name: display,
            existing: existing.display_name(),
        });
    }

    write_atomically(&identity, content)?;
    info!(path = %identity.display(), created, "saved definition");

    let record = Record::new(definition, identity.clone(), relative_name.clone());
    if created {
        catalog.push(record);
    } else {
        catalog.replace(record);
    }
    Ok(Saved {
        identity,
        relative_name,
        created,
    })
}

pub fn delete(
    catalog: &mut Catalog,
    identity: &Path,
    confirm: &dyn ConfirmDelete,
) -> Result<DeleteOutcome> {
    let record = catalog
        .get(identity)
        .ok_or_else(|| CatalogError::validation(format!("no definition at {}", identity.display())))?;
    if !confirm.confirm(record) {
        return Ok(DeleteOutcome::Declined);
    }

    fs::remove_file(identity).map_err(|source| CatalogError::Delete {
        path: identity.to_path_buf(),
        source,
    })?;
    info!(path = %identity.display(), "deleted definition");

    match catalog.remove(identity) {
        Some(record) => Ok(DeleteOutcome::Deleted(record)),
        None => Err(CatalogError::validation(format!(
            "{} vanished from the catalog during delete",
            identity.display()
        ))),
    }
}

fn normalize_new_name(name: &str) -> Result<PathBuf> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::validation("file name must not be empty"));
    }
    let mut path = PathBuf::from(trimmed);
    if !has_definition_extension(&path) {
        path = PathBuf::from(format!("{trimmed}.{DEFINITION_EXTENSION}"));
    }
    if !path
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(CatalogError::validation(format!(
            "'{trimmed}' must be a relative path inside the definition root"
        )));
    }
    Ok(path)
}

fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let write_err = |source| CatalogError::Write {
        path: path.to_path_buf(),
        source,
    };
    let parent = path
        .parent()
        .ok_or_else(|| CatalogError::validation(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(parent).map_err(write_err)?;

    let mut staged = NamedTempFile::new_in(parent).map_err(write_err)?;
    staged.write_all(content.as_bytes()).map_err(write_err)?;
    staged.as_file().sync_all().map_err(write_err)?;
    if let Ok(meta) = fs::metadata(path) {
        // Keep the mode of the file being replaced rather than the 0600 of
        // the staging file.
        if let Err(err) = fs::set_permissions(staged.path(), meta.permissions()) {
            warn!(path = %path.display(), error = %err, "could not carry file mode over");
        }
    }
    staged.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
