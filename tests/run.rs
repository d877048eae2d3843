#![cfg(unix)]
// Scanner launches, target files and batch workspaces.
mod support;
#[path = "support/common.rs"]
mod common;

use anyhow::Result;
use pocdex::{
    CatalogError, CatalogService, CommandSpec, Platform, RunRequest, RunSelection, ScanOptions,
};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use common::{DefinitionTree, Harness, files_under};

fn args(spec: &CommandSpec) -> Vec<String> {
    spec.args
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn request(selection: RunSelection, targets: &[&str]) -> RunRequest {
    RunRequest {
        selection,
        targets: targets.iter().map(|t| t.to_string()).collect(),
        options: ScanOptions::default(),
    }
}

fn batch_tree() -> DefinitionTree {
    let tree = DefinitionTree::new();
    tree.write_poc("x/dup.yaml", "dup-x", "high", "batchme");
    tree.write_poc("y/dup.yaml", "dup-y", "high", "batchme");
    tree.write_poc("z/one.yaml", "one", "low", "batchme");
    tree.write_poc("two.yaml", "two", "info", "batchme");
    tree.write_poc("deep/n/three.yaml", "three", "medium", "batchme");
    tree.write_poc("skip-a.yaml", "skip-a", "high", "other");
    tree.write_poc("x/skip-b.yaml", "skip-b", "high", "other");
    tree
}

#[test]
fn single_run_writes_targets_and_launches_terminal() -> Result<()> {
    let tree = DefinitionTree::new();
    tree.write_poc("web/a.yaml", "a", "high", "rce");
    let harness = Harness::new();
    let mut service = harness.service()?;
    service.load(tree.root())?;
    let identity = service.find("web/a.yaml").expect("loaded").identity.clone();

    let mut req = request(
        RunSelection::Single(identity.clone()),
        &[" https://a.example ", "", "https://b.example\n"],
    );
    req.options = ScanOptions {
        verbose: true,
        debug: false,
        proxy: Some("http://127.0.0.1:8080".to_string()),
    };
    let scan = service.run(&req)?;

    let targets = harness.targets_file();
    assert_eq!(
        fs::read_to_string(&targets)?,
        "https://a.example\nhttps://b.example"
    );
    assert_eq!(scan.program, service.settings().scanner);
    assert_eq!(
        args(&scan),
        vec![
            "-t".to_string(),
            identity.display().to_string(),
            "-l".to_string(),
            targets.display().to_string(),
            "--dresp".to_string(),
            "-proxy".to_string(),
            "http://127.0.0.1:8080".to_string(),
        ]
    );

    let launched = harness.launched();
    assert_eq!(launched.len(), 1);
    assert_eq!(launched[0].program, OsString::from("x-terminal-emulator"));
    assert_eq!(args(&launched[0])[0], "-e");
    assert!(args(&launched[0])[1].contains("exec bash"));
    assert!(service.current_workspace().is_none());
    Ok(())
}

#[test]
fn batch_run_stages_exactly_the_filtered_view() -> Result<()> {
    let tree = batch_tree();
    let harness = Harness::new();
    let mut service = harness.service()?;
    service.load(tree.root())?;
    assert_eq!(service.search("batchme"), 5);

    let scan = service.run(&request(RunSelection::View, &["10.0.0.1"]))?;
    let workspace = service.current_workspace().expect("workspace staged").to_path_buf();
    assert!(workspace.starts_with(harness.workspace_parent()));
    assert_eq!(args(&scan)[1], workspace.display().to_string());
    assert_eq!(
        files_under(&workspace)?,
        vec![
            "deep/n/three.yaml",
            "two.yaml",
            "x/dup.yaml",
            "y/dup.yaml",
            "z/one.yaml",
        ]
    );
    assert_eq!(
        fs::read_to_string(workspace.join("y/dup.yaml"))?,
        fs::read_to_string(tree.root().join("y/dup.yaml"))?
    );
    Ok(())
}

#[test]
fn new_batch_replaces_old_workspace_and_shutdown_purges() -> Result<()> {
    let tree = batch_tree();
    let harness = Harness::new();
    let mut service = harness.service()?;
    service.load(tree.root())?;

    service.search("batchme");
    service.run(&request(RunSelection::View, &["t"]))?;
    let first: PathBuf = service.current_workspace().expect("first").to_path_buf();

    service.search("other");
    service.run(&request(RunSelection::View, &["t"]))?;
    let second: PathBuf = service.current_workspace().expect("second").to_path_buf();

    assert_ne!(first, second);
    assert!(!first.exists());
    assert_eq!(files_under(&second)?, vec!["skip-a.yaml", "x/skip-b.yaml"]);

    service.shutdown();
    assert!(!second.exists());
    assert!(service.current_workspace().is_none());
    assert_eq!(harness.launched().len(), 2);
    Ok(())
}

#[test]
fn dropping_the_service_removes_its_workspace() -> Result<()> {
    let tree = batch_tree();
    let harness = Harness::new();
    let workspace = {
        let mut service = harness.service()?;
        service.load(tree.root())?;
        service.run(&request(RunSelection::View, &["t"]))?;
        service.current_workspace().expect("staged").to_path_buf()
    };
    assert!(!workspace.exists());
    Ok(())
}

#[test]
fn missing_targets_or_empty_view_launch_nothing() -> Result<()> {
    let tree = batch_tree();
    let harness = Harness::new();
    let mut service = harness.service()?;
    service.load(tree.root())?;
    let identity = service.find("two.yaml").expect("loaded").identity.clone();

    let err = service
        .run(&request(RunSelection::Single(identity), &["  ", ""]))
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));

    service.search("no-definition-mentions-this");
    let err = service.run(&request(RunSelection::View, &["t"])).unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));

    assert!(harness.launched().is_empty());
    assert!(service.current_workspace().is_none());
    Ok(())
}

#[test]
fn run_requires_loaded_root_and_existing_file() -> Result<()> {
    let tree = DefinitionTree::new();
    let path = tree.write_poc("gone.yaml", "gone", "low", "x");
    let harness = Harness::new();
    let mut service = harness.service()?;

    let err = service.run(&request(RunSelection::View, &["t"])).unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));

    service.load(tree.root())?;
    let identity = service.find("gone.yaml").expect("loaded").identity.clone();
    fs::remove_file(path)?;
    let err = service
        .run(&request(RunSelection::Single(identity), &["t"]))
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));
    assert!(harness.launched().is_empty());
    Ok(())
}

#[test]
fn missing_scanner_is_a_launch_error() -> Result<()> {
    let tree = DefinitionTree::new();
    tree.write_poc("a.yaml", "a", "low", "x");
    let harness = Harness::new();

    for scanner in ["/nonexistent/pocdex-scanner", "pocdex-scanner-not-on-path"] {
        let mut settings = harness.settings()?;
        settings.scanner = scanner.into();
        let mut service = CatalogService::new(settings)?
            .with_platform(Platform::Linux)
            .with_launcher(Box::new(harness.launcher.clone()));
        service.load(tree.root())?;
        let identity = service.find("a.yaml").expect("loaded").identity.clone();

        let err = service
            .run(&request(RunSelection::Single(identity), &["t"]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Launch { .. }), "{scanner}");
    }
    assert!(harness.launched().is_empty());
    Ok(())
}

#[test]
fn reveal_opens_containing_directory() -> Result<()> {
    let tree = DefinitionTree::new();
    tree.write_poc("sub/a.yaml", "a", "low", "x");
    let harness = Harness::new();
    let mut service = harness.service()?;
    service.load(tree.root())?;
    let identity = service.find("sub/a.yaml").expect("loaded").identity.clone();

    service.reveal(&identity)?;
    let launched = harness.launched();
    assert_eq!(launched.len(), 1);
    assert_eq!(launched[0].program, OsString::from("xdg-open"));
    assert_eq!(
        launched[0].args,
        vec![identity.parent().expect("has parent").as_os_str().to_os_string()]
    );

    let err = service.reveal(Path::new("/no/such/record.yaml")).unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));
    Ok(())
}
