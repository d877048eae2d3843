//! Typed failures surfaced by catalog operations.
//!
//! Per-record load failures never reach this type; the loader logs them and
//! keeps going. Everything here aborts one operation and leaves the catalog as
//! it was, with the delete path as the single documented exception.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Content is empty or is not a structured mapping.
    #[error("parse error in {origin}: {message}")]
    Parse { origin: String, message: String },

    /// Another record already owns this relative name.
    #[error("a definition named '{name}' already exists")]
    DuplicateName { name: String },

    /// Identical content already lives under another name.
    #[error("content of '{name}' duplicates existing definition '{existing}'")]
    DuplicateContent { name: String, existing: String },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete {}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Caller input rejected before any state changed.
    #[error("{0}")]
    Validation(String),

    /// The terminal or scanner could not be started.
    #[error("failed to launch '{program}': {message}")]
    Launch { program: String, message: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        CatalogError::Io {
            context: context.into(),
            source,
        }
    }
}
