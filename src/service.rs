//! Command handlers over one catalog.
//!
//! `CatalogService` is the only thing a front end needs: it owns the catalog,
//! the filtered view, paging state, the root history, the batch workspace and
//! any in-flight load. All methods run on the caller's thread; the only other
//! thread is a load worker, which hands over a finished record list and never
//! touches the catalog itself.

use crate::catalog::{Catalog, Page, Pager};
use crate::command::{
    CommandSpec, DetachedLauncher, Launcher, Platform, ScanOptions, ensure_program_available,
    reveal_command, scan_command, terminal_command, write_targets_file,
};
use crate::config::Settings;
use crate::error::{CatalogError, Result};
use crate::file_sync::{self, ConfirmDelete, DeleteOutcome, SaveTarget, Saved};
use crate::history::History;
use crate::loader::{LoadEvent, LoadFailure, LoadOutcome, LoadTask, Progress};
use crate::record::Record;
use crate::search::Query;
use crate::workspace::BatchWorkspaces;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub root: PathBuf,
    pub loaded: usize,
    pub failures: Vec<LoadFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Running(Option<Progress>),
    Finished(LoadSummary),
}

/// What a run should scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunSelection {
    /// One record, by identity.
    Single(PathBuf),
    /// Every record in the current filtered view, via a batch workspace.
    View,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRequest {
    pub selection: RunSelection,
    pub targets: Vec<String>,
    pub options: ScanOptions,
}

pub struct CatalogService {
    settings: Settings,
    platform: Platform,
    launcher: Box<dyn Launcher>,
    catalog: Catalog,
    pager: Pager,
    history: History,
    loading: Option<LoadTask>,
    last_progress: Option<Progress>,
    generation: u64,
    workspaces: BatchWorkspaces,
}

impl CatalogService {
    pub fn new(settings: Settings) -> Result<Self> {
        let history = History::load(&settings.history_file)?;
        Ok(Self {
            platform: Platform::host(),
            launcher: Box::new(DetachedLauncher),
            catalog: Catalog::new(),
            pager: Pager::new(settings.page_size),
            workspaces: BatchWorkspaces::new(settings.workspace_parent.clone()),
            history,
            loading: None,
            last_progress: None,
            generation: 0,
            settings,
        })
    }

    pub fn with_launcher(mut self, launcher: Box<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn remove_history(&mut self, roots: &[PathBuf]) -> Result<()> {
        self.history.remove(roots)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear()
    }

    // --- loading -------------------------------------------------------

    /// Start loading `root` in the background, superseding any load still
    /// in flight.
    pub fn begin_load(&mut self, root: &Path) -> Result<()> {
        if !root.is_dir() {
            return Err(CatalogError::validation(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        let root = fs::canonicalize(root)
            .map_err(|err| CatalogError::io(format!("resolving {}", root.display()), err))?;

        // Dropping the old task cancels it without waiting for its worker;
        // its queued events go with the receiver.
        if let Some(previous) = self.loading.take() {
            info!(generation = previous.generation(), "superseding outstanding load");
        }
        self.generation += 1;
        self.last_progress = None;
        self.loading = Some(LoadTask::spawn(root.clone(), self.generation));

        if let Err(err) = self.history.record(&root) {
            warn!(error = %err, "could not update root history");
        }
        Ok(())
    }

    /// Drain pending load events without blocking. A finished load is
    /// installed before this returns.
    pub fn poll_load(&mut self) -> Result<LoadStatus> {
        loop {
            let Some(task) = self.loading.as_ref() else {
                return Ok(LoadStatus::Idle);
            };
            match task.try_next() {
                Some(LoadEvent::Progress(progress)) => self.last_progress = Some(progress),
                Some(LoadEvent::Finished(result)) => {
                    return self.finish_load(result).map(LoadStatus::Finished);
                }
                None => return Ok(LoadStatus::Running(self.last_progress)),
            }
        }
    }

    /// Block until the current load completes.
    pub fn wait_for_load(&mut self, mut on_progress: impl FnMut(Progress)) -> Result<LoadSummary> {
        loop {
            let Some(task) = self.loading.as_ref() else {
                return Err(CatalogError::validation("no load is in progress"));
            };
            match task.next() {
                Some(LoadEvent::Progress(progress)) => {
                    self.last_progress = Some(progress);
                    on_progress(progress);
                }
                Some(LoadEvent::Finished(result)) => return self.finish_load(result),
                None => {
                    self.loading = None;
                    return Err(CatalogError::validation("load ended without completing"));
                }
            }
        }
    }

    pub fn load(&mut self, root: &Path) -> Result<LoadSummary> {
        self.begin_load(root)?;
        self.wait_for_load(|_| {})
    }

    fn finish_load(&mut self, result: Result<LoadOutcome>) -> Result<LoadSummary> {
        self.loading = None;
        let outcome = result?;
        let summary = LoadSummary {
            root: outcome.root.clone(),
            loaded: outcome.records.len(),
            failures: outcome.failures,
        };
        self.catalog.install(outcome.root, outcome.records);
        self.pager.reset();
        Ok(summary)
    }

    // --- search and paging ---------------------------------------------

    /// Apply a query and return the size of the resulting view.
    pub fn search(&mut self, input: &str) -> usize {
        self.catalog.set_query(Query::parse(input));
        self.pager.reset();
        self.catalog.view_len()
    }

    pub fn reset_search(&mut self) {
        self.search("");
    }

    pub fn page(&self) -> Page<&Record> {
        let len = self.catalog.view_len();
        let range = self.pager.range(len);
        Page {
            number: self.pager.current(),
            total_pages: self.pager.total_pages(len),
            offset: range.start,
            items: self.catalog.view_slice(range.start, range.end),
        }
    }

    pub fn next_page(&mut self) -> bool {
        self.pager.next(self.catalog.view_len())
    }

    pub fn prev_page(&mut self) -> bool {
        self.pager.prev()
    }

    pub fn goto_page(&mut self, input: &str) -> Result<usize> {
        self.pager.goto(input, self.catalog.view_len())
    }

    // --- records -------------------------------------------------------

    pub fn find(&self, relative_name: &str) -> Option<&Record> {
        self.catalog.find_by_name(Path::new(relative_name))
    }

    pub fn read_content(&self, identity: &Path) -> Result<String> {
        let record = self.require(identity)?;
        fs::read_to_string(&record.identity)
            .map_err(|err| CatalogError::io(format!("reading {}", record.identity.display()), err))
    }

    pub fn save(&mut self, content: &str, target: SaveTarget<'_>) -> Result<Saved> {
        let saved = file_sync::save(&mut self.catalog, content, target)?;
        self.pager.clamp(self.catalog.view_len());
        Ok(saved)
    }

    pub fn delete(&mut self, identity: &Path, confirm: &dyn ConfirmDelete) -> Result<DeleteOutcome> {
        let outcome = file_sync::delete(&mut self.catalog, identity, confirm)?;
        self.pager.clamp(self.catalog.view_len());
        Ok(outcome)
    }

    // --- external tools ------------------------------------------------

    /// Launch the scanner in a terminal and return the scanner command that
    /// was wrapped.
    pub fn run(&mut self, request: &RunRequest) -> Result<CommandSpec> {
        if self.catalog.root().is_none() {
            return Err(CatalogError::validation("no definition root is loaded"));
        }
        if let RunSelection::Single(identity) = &request.selection {
            let record = self.require(identity)?;
            if !record.identity.is_file() {
                return Err(CatalogError::validation(format!(
                    "definition file {} no longer exists",
                    record.identity.display()
                )));
            }
        } else if self.catalog.view_len() == 0 {
            return Err(CatalogError::validation("the current view is empty"));
        }

        write_targets_file(&self.settings.targets_file, &request.targets)?;
        ensure_program_available(&self.settings.scanner)?;

        let template = match &request.selection {
            RunSelection::Single(identity) => identity.clone(),
            RunSelection::View => self.workspaces.stage(self.catalog.view())?.to_path_buf(),
        };
        let scan = scan_command(
            &self.settings.scanner,
            &template,
            &self.settings.targets_file,
            &request.options,
        );
        let wrapped = terminal_command(self.platform, &self.settings.terminal, &scan);
        self.launcher.launch(&wrapped)?;
        info!(command = %scan.to_shell_line(), "scanner launched");
        Ok(scan)
    }

    pub fn current_workspace(&self) -> Option<&Path> {
        self.workspaces.current()
    }

    pub fn reveal(&self, identity: &Path) -> Result<()> {
        let record = self.require(identity)?;
        self.launcher
            .launch(&reveal_command(self.platform, &record.identity))
    }

    /// Stop any load and delete every batch workspace.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.loading.take() {
            task.cancel();
        }
        self.workspaces.purge();
    }

    fn require(&self, identity: &Path) -> Result<&Record> {
        self.catalog.get(identity).ok_or_else(|| {
            CatalogError::validation(format!("no definition at {}", identity.display()))
        })
    }
}
