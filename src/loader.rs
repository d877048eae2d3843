//! Directory ingestion.
//!
//! `scan_definitions` walks a root, parses every `*.yaml` file and returns the
//! surviving records in scan order. Files that fail to read or parse are
//! logged and skipped. `LoadTask` runs the same scan on a worker thread and
//! reports back over a channel: one progress event per file, then a single
//! completion event carrying the whole record list.

use crate::error::{CatalogError, Result};
use crate::record::{Definition, Record, display_relative, has_definition_extension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Completed share in `0.0..=1.0`; an empty scan counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub root: PathBuf,
    pub records: Vec<Record>,
    pub failures: Vec<LoadFailure>,
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress(Progress),
    Finished(Result<LoadOutcome>),
}

/// Scan `root` synchronously, calling `on_progress` after every file.
///
/// Returns `Ok(None)` if `cancel` was raised mid-scan.
pub fn scan_definitions(
    root: &Path,
    cancel: &AtomicBool,
    mut on_progress: impl FnMut(Progress),
) -> Result<Option<LoadOutcome>> {
    let root = fs::canonicalize(root)
        .map_err(|err| CatalogError::io(format!("resolving root {}", root.display()), err))?;
    if !root.is_dir() {
        return Err(CatalogError::validation(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let Some(files) = collect_definition_files(&root, cancel) else {
        info!(root = %root.display(), "load superseded during walk");
        return Ok(None);
    };
    let total = files.len();
    info!(root = %root.display(), total, "loading definitions");

    let mut records = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (idx, path) in files.into_iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            info!(root = %root.display(), "load superseded");
            return Ok(None);
        }
        match read_record(&root, &path) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping definition");
                failures.push(LoadFailure {
                    path: path.clone(),
                    message: err.to_string(),
                });
            }
        }
        let progress = Progress {
            processed: idx + 1,
            total,
        };
        debug!(processed = progress.processed, total, "load progress");
        on_progress(progress);
    }

    info!(
        root = %root.display(),
        loaded = records.len(),
        skipped = failures.len(),
        "load finished"
    );
    Ok(Some(LoadOutcome {
        root,
        records,
        failures,
    }))
}

/// Definition files under `root` in name order, or `None` once `cancel` is
/// raised. Directory symlinks are not followed; file symlinks are resolved.
fn collect_definition_files(root: &Path, cancel: &AtomicBool) -> Option<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        if cancel.load(Ordering::SeqCst) {
            return None;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "unreadable directory entry");
                continue;
            }
        };
        let file_type = entry.file_type();
        let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
        if is_file && has_definition_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Some(files)
}

fn read_record(root: &Path, path: &Path) -> Result<Record> {
    let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let text = fs::read_to_string(path)
        .map_err(|err| CatalogError::io(format!("reading {}", path.display()), err))?;
    let definition = Definition::parse(&text, &display_relative(&relative))?;
    Ok(Record::new(definition, path.to_path_buf(), relative))
}

/// A scan running on a worker thread.
///
/// Each task remembers the generation it was started for; events carry no
/// tag. A superseded task is dropped, which raises its cancel flag and drops
/// the receiving end, so nothing it still sends can reach the caller. The
/// worker is detached rather than joined and exits at its next cancel check.
pub struct LoadTask {
    generation: u64,
    cancel: Arc<AtomicBool>,
    events: Receiver<LoadEvent>,
}

impl LoadTask {
    pub fn spawn(root: PathBuf, generation: u64) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, events) = mpsc::channel();
        let worker_cancel = Arc::clone(&cancel);
        thread::spawn(move || {
            let progress_tx = tx.clone();
            let outcome = scan_definitions(&root, &worker_cancel, |progress| {
                let _ = progress_tx.send(LoadEvent::Progress(progress));
            });
            match outcome {
                Ok(Some(outcome)) => {
                    let _ = tx.send(LoadEvent::Finished(Ok(outcome)));
                }
                Ok(None) => {}
                Err(err) => {
                    let _ = tx.send(LoadEvent::Finished(Err(err)));
                }
            }
        });
        Self {
            generation,
            cancel,
            events,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Ask the worker to stop before its next file. No completion event is
    /// sent for a cancelled scan.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Next event without blocking. `None` means nothing is pending yet or
    /// the worker has gone away.
    pub fn try_next(&self) -> Option<LoadEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the next event; `None` once the worker has exited.
    pub fn next(&self) -> Option<LoadEvent> {
        self.events.recv().ok()
    }
}

impl Drop for LoadTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
