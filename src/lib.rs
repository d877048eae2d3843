//! Catalog engine for security test-case definitions.
//!
//! A definition root is scanned into an ordered `Catalog` of `Record`s,
//! filtered with boolean substring queries, paged, edited through
//! `file_sync`, and handed to an external scanner running in its own
//! terminal. `CatalogService` ties the pieces together behind one set of
//! command handlers.

pub mod catalog;
pub mod command;
pub mod config;
pub mod error;
pub mod file_sync;
pub mod history;
pub mod loader;
pub mod record;
pub mod search;
pub mod service;
pub mod workspace;

pub use catalog::{Catalog, DEFAULT_PAGE_SIZE, Page, Pager};
pub use command::{
    CommandSpec, DetachedLauncher, Launcher, Platform, ScanOptions, scan_command,
    terminal_command,
};
pub use config::Settings;
pub use error::{CatalogError, Result};
pub use file_sync::{ConfirmDelete, DeleteOutcome, SaveTarget, Saved};
pub use history::{History, MAX_HISTORY_ENTRIES};
pub use loader::{LoadEvent, LoadFailure, LoadOutcome, LoadTask, Progress, scan_definitions};
pub use record::{Definition, Info, Record, RecordRow, Severity};
pub use search::{MatchMode, Query};
pub use service::{CatalogService, LoadStatus, LoadSummary, RunRequest, RunSelection};
pub use workspace::BatchWorkspaces;

/// Split a comma- or whitespace-separated list, dropping empties.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
