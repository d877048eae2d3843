//! Command-line front end for the definition catalog.
//!
//! Usage:
//!   pocdex --root ./pocs list --query "critical AND rce" --page 2
//!   pocdex save new.yaml --as web/new-check
//!   pocdex run web/new-check.yaml --target https://example.com --proxy http://127.0.0.1:8080
//!   pocdex run --all --query rce --targets targets.txt
//!
//! Without `--root` the most recently used root from the history file is
//! loaded.

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand};
use pocdex::{
    CatalogService, DeleteOutcome, Record, RunRequest, RunSelection, SaveTarget, ScanOptions,
    Settings, split_list,
};
use serde_json::json;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pocdex")]
#[command(about = "Browse, search, edit and scan a directory of security test definitions")]
struct Cli {
    /// Definition root; defaults to the most recent history entry.
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Scanner executable (overrides POCDEX_SCANNER).
    #[arg(long, global = true)]
    scanner: Option<PathBuf>,
    /// Log more (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of the (optionally filtered) catalog.
    List {
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value = "1")]
        page: String,
        /// Emit the page as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print a definition's file contents.
    Show { name: String },
    /// Save a file's contents as a new or existing definition.
    Save {
        file: PathBuf,
        /// Name for a new definition (defaults to the input file name).
        #[arg(long = "as", conflicts_with = "edit")]
        as_name: Option<String>,
        /// Overwrite this existing definition instead.
        #[arg(long)]
        edit: Option<String>,
    },
    /// Delete a definition and its file.
    Delete {
        name: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Launch the scanner in a new terminal.
    Run {
        /// Definition to scan; omit with --all.
        #[arg(required_unless_present = "all")]
        name: Option<String>,
        /// Scan every definition in the filtered view.
        #[arg(long, conflicts_with = "name")]
        all: bool,
        /// Filter applied before --all.
        #[arg(long, requires = "all")]
        query: Option<String>,
        /// File with one target per line.
        #[arg(long)]
        targets: Option<PathBuf>,
        /// Target(s), comma separated or repeated.
        #[arg(long = "target")]
        target: Vec<String>,
        /// Ask the scanner to dump responses.
        #[arg(long)]
        dresp: bool,
        /// Run the scanner in debug mode.
        #[arg(long)]
        debug: bool,
        #[arg(long)]
        proxy: Option<String>,
    },
    /// Open the file manager at a definition.
    Reveal { name: String },
    /// Show or edit the recently used roots.
    History {
        #[arg(long)]
        remove: Vec<PathBuf>,
        #[arg(long)]
        clear: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::from_env();
    if let Some(scanner) = &cli.scanner {
        settings.scanner = scanner.clone().into_os_string();
    }
    let mut service = CatalogService::new(settings).context("initializing catalog")?;

    if let Command::History { remove, clear } = &cli.command {
        return run_history(&mut service, remove, *clear);
    }

    let root = resolve_root(&service, cli.root.as_deref())?;
    let summary = service
        .load(&root)
        .with_context(|| format!("loading {}", root.display()))?;
    for failure in &summary.failures {
        eprintln!("skipped {}: {}", failure.path.display(), failure.message);
    }

    let result = dispatch(&mut service, cli.command);
    service.shutdown();
    result
}

fn dispatch(service: &mut CatalogService, command: Command) -> Result<()> {
    match command {
        Command::List { query, page, json } => {
            service.search(query.as_deref().unwrap_or(""));
            service.goto_page(&page)?;
            print_page(service, json)
        }
        Command::Show { name } => {
            let identity = lookup(service, &name)?;
            print!("{}", service.read_content(&identity)?);
            Ok(())
        }
        Command::Save {
            file,
            as_name,
            edit,
        } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let saved = match edit {
                Some(existing) => {
                    let identity = lookup(service, &existing)?;
                    service.save(&content, SaveTarget::Existing(&identity))?
                }
                None => {
                    let name = match as_name {
                        Some(name) => name,
                        None => file
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .ok_or_else(|| anyhow!("{} has no file name", file.display()))?,
                    };
                    service.save(&content, SaveTarget::New(&name))?
                }
            };
            println!(
                "{} {}",
                if saved.created { "created" } else { "updated" },
                saved.identity.display()
            );
            Ok(())
        }
        Command::Delete { name, yes } => {
            let identity = lookup(service, &name)?;
            let confirm = |record: &Record| yes || prompt_yes(&format!("delete {}?", record.display_name()));
            match service.delete(&identity, &confirm)? {
                DeleteOutcome::Deleted(record) => println!("deleted {}", record.display_name()),
                DeleteOutcome::Declined => println!("kept {name}"),
            }
            Ok(())
        }
        Command::Run {
            name,
            all,
            query,
            targets,
            target,
            dresp,
            debug,
            proxy,
        } => {
            let mut target_lines: Vec<String> =
                target.iter().flat_map(|t| split_list(t)).collect();
            if let Some(path) = targets {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("reading targets {}", path.display()))?;
                target_lines.extend(text.lines().map(str::to_string));
            }

            let selection = if all {
                service.search(query.as_deref().unwrap_or(""));
                RunSelection::View
            } else {
                let name = name.ok_or_else(|| anyhow!("a definition name or --all is required"))?;
                RunSelection::Single(lookup(service, &name)?)
            };
            let request = RunRequest {
                selection,
                targets: target_lines,
                options: ScanOptions {
                    verbose: dresp,
                    debug,
                    proxy,
                },
            };
            let scan = service.run(&request)?;
            println!("{}", scan.to_shell_line());
            if let Some(workspace) = service.current_workspace() {
                eprintln!(
                    "batch workspace {} stays until you press Enter",
                    workspace.display()
                );
                let mut line = String::new();
                io::stdin().lock().read_line(&mut line)?;
            }
            Ok(())
        }
        Command::Reveal { name } => {
            let identity = lookup(service, &name)?;
            service.reveal(&identity)?;
            Ok(())
        }
        Command::History { remove, clear } => run_history(service, &remove, clear),
    }
}

fn run_history(service: &mut CatalogService, remove: &[PathBuf], clear: bool) -> Result<()> {
    if clear {
        service.clear_history()?;
    } else if !remove.is_empty() {
        service.remove_history(remove)?;
    }
    for entry in service.history().entries() {
        println!("{}", entry.display());
    }
    Ok(())
}

fn resolve_root(service: &CatalogService, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root.to_path_buf());
    }
    match service.history().last_existing() {
        Some(root) => Ok(root.to_path_buf()),
        None => bail!("no --root given and no usable entry in the history file"),
    }
}

fn lookup(service: &CatalogService, name: &str) -> Result<PathBuf> {
    service
        .find(name)
        .map(|record| record.identity.clone())
        .ok_or_else(|| anyhow!("no definition named '{name}' under the loaded root"))
}

fn print_page(service: &CatalogService, as_json: bool) -> Result<()> {
    let page = service.page();
    let catalog = service.catalog();
    if as_json {
        let rows: Vec<_> = page.items.iter().map(|record| record.row()).collect();
        let doc = json!({
            "page": page.number,
            "total_pages": page.total_pages,
            "view_len": catalog.view_len(),
            "catalog_len": catalog.len(),
            "query": catalog.query().map(|q| q.as_str()),
            "rows": rows,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    for (offset, record) in page.items.iter().enumerate() {
        let row = record.row();
        println!(
            "{:>5}  {:<8}  {}  [{}]  {}",
            page.offset + offset + 1,
            row.severity,
            row.name,
            row.tags,
            row.cve_id
        );
    }
    println!(
        "page {}/{} ({} of {} definitions)",
        page.number,
        page.total_pages,
        catalog.view_len(),
        catalog.len()
    );
    Ok(())
}

fn prompt_yes(question: &str) -> bool {
    eprint!("{question} [y/N] ");
    let _ = io::stderr().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}
