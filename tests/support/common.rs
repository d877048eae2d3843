#![allow(dead_code)]

use anyhow::Result;
use pocdex::{CatalogService, CommandSpec, Launcher, Platform, Settings};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::support::fake_scanner;

/// A definition root inside a temp directory.
pub struct DefinitionTree {
    dir: TempDir,
}

impl DefinitionTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create definition root"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        fs::write(&path, contents).expect("failed to write fixture");
        path
    }

    pub fn write_poc(&self, relative: &str, id: &str, severity: &str, tags: &str) -> PathBuf {
        self.write(relative, &poc_text(id, severity, tags))
    }
}

pub fn poc_text(id: &str, severity: &str, tags: &str) -> String {
    format!(
        "id: {id}\n\ninfo:\n  name: {id} check\n  author: tester\n  severity: {severity}\n  tags: {tags}\n  reference:\n    - https://ref.example/{id}\n\nhttp:\n  - method: GET\n    path:\n      - \"{{{{BaseURL}}}}/{id}\"\n    matchers:\n      - type: status\n        status:\n          - 200\n"
    )
}

/// Records every launched command instead of spawning anything.
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    pub launched: Rc<RefCell<Vec<CommandSpec>>>,
}

impl Launcher for RecordingLauncher {
    fn launch(&self, spec: &CommandSpec) -> pocdex::Result<()> {
        self.launched.borrow_mut().push(spec.clone());
        Ok(())
    }
}

/// Scratch space for history, targets, workspaces and the fake scanner.
pub struct Harness {
    pub scratch: TempDir,
    pub launcher: RecordingLauncher,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            scratch: TempDir::new().expect("failed to create scratch dir"),
            launcher: RecordingLauncher::default(),
        }
    }

    pub fn workspace_parent(&self) -> PathBuf {
        self.scratch.path().join("workspaces")
    }

    pub fn targets_file(&self) -> PathBuf {
        self.scratch.path().join("targets.txt")
    }

    pub fn history_file(&self) -> PathBuf {
        self.scratch.path().join("history")
    }

    pub fn settings(&self) -> Result<Settings> {
        let scanner = fake_scanner(self.scratch.path())?;
        let home = self.scratch.path().to_string_lossy().into_owned();
        let mut settings = Settings::from_lookup(|key| match key {
            "HOME" => Some(home.clone()),
            _ => None,
        });
        settings.scanner = scanner.into_os_string();
        settings.history_file = self.history_file();
        settings.targets_file = self.targets_file();
        settings.workspace_parent = self.workspace_parent();
        Ok(settings)
    }

    pub fn service(&self) -> Result<CatalogService> {
        Ok(CatalogService::new(self.settings()?)?
            .with_platform(Platform::Linux)
            .with_launcher(Box::new(self.launcher.clone())))
    }

    pub fn launched(&self) -> Vec<CommandSpec> {
        self.launcher.launched.borrow().clone()
    }
}

/// Relative names of every file under `dir`, sorted, with forward slashes.
pub fn files_under(dir: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(dir)?;
        out.push(pocdex::record::display_relative(rel));
    }
    out.sort();
    Ok(out)
}
