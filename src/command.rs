//! Scanner command planning and detached launch.
//!
//! A run is planned in two layers: `scan_command` builds the scanner's own
//! argument vector, and `terminal_command` wraps it in whatever opens an
//! interactive terminal on the host platform. The wrapped command is handed to
//! a `Launcher`, which starts it and walks away; the scanner's output, exit
//! status and lifetime belong to the terminal, not to us.

use crate::error::{CatalogError, Result};
use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, info};

const TEMPLATE_FLAG: &str = "-t";
const TARGET_LIST_FLAG: &str = "-l";
const DEBUG_FLAG: &str = "-debug";
const VERBOSE_FLAG: &str = "--dresp";
const PROXY_FLAG: &str = "-proxy";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    /// Render as a single POSIX shell line.
    pub fn to_shell_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| shell_quote(&part.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

/// Scanner switches chosen by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub verbose: bool,
    pub debug: bool,
    pub proxy: Option<String>,
}

pub fn scan_command(
    scanner: &OsStr,
    template: &Path,
    targets_file: &Path,
    options: &ScanOptions,
) -> CommandSpec {
    let mut args: Vec<OsString> = vec![
        TEMPLATE_FLAG.into(),
        template.as_os_str().to_os_string(),
        TARGET_LIST_FLAG.into(),
        targets_file.as_os_str().to_os_string(),
    ];
    if options.debug {
        args.push(DEBUG_FLAG.into());
    }
    if options.verbose {
        args.push(VERBOSE_FLAG.into());
    }
    if let Some(proxy) = options
        .proxy
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        args.push(PROXY_FLAG.into());
        args.push(proxy.into());
    }
    CommandSpec {
        program: scanner.to_os_string(),
        args,
    }
}

/// Overwrite the target-list file with one trimmed target per line.
pub fn write_targets_file(path: &Path, targets: &[String]) -> Result<()> {
    let lines: Vec<&str> = targets
        .iter()
        .flat_map(|t| t.lines())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(CatalogError::validation("at least one scan target is required"));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| CatalogError::io(format!("creating {}", parent.display()), err))?;
    }
    fs::write(path, lines.join("\n"))
        .map_err(|err| CatalogError::io(format!("writing targets to {}", path.display()), err))
}

/// Wrap `inner` so it runs inside a new interactive terminal window.
///
/// `terminal` is only consulted on Linux, where no single emulator is
/// guaranteed to exist.
pub fn terminal_command(platform: Platform, terminal: &OsStr, inner: &CommandSpec) -> CommandSpec {
    match platform {
        Platform::Windows => {
            let mut args: Vec<OsString> =
                vec!["/C".into(), "start".into(), "pocdex".into(), "cmd".into(), "/K".into()];
            args.push(inner.program.clone());
            args.extend(inner.args.iter().cloned());
            CommandSpec {
                program: "cmd".into(),
                args,
            }
        }
        Platform::MacOs => {
            let script = format!(
                "tell application \"Terminal\" to do script \"{}\"",
                applescript_escape(&inner.to_shell_line())
            );
            CommandSpec {
                program: "osascript".into(),
                args: vec!["-e".into(), script.into()],
            }
        }
        Platform::Linux => {
            let keep_open = format!("{}; exec bash", inner.to_shell_line());
            CommandSpec {
                program: terminal.to_os_string(),
                args: vec!["-e".into(), format!("bash -c {}", shell_quote(&keep_open)).into()],
            }
        }
    }
}

/// Open the platform file manager at `path`.
pub fn reveal_command(platform: Platform, path: &Path) -> CommandSpec {
    match platform {
        Platform::Windows => {
            let mut select = OsString::from("/select,");
            select.push(path.as_os_str());
            CommandSpec {
                program: "explorer".into(),
                args: vec![select],
            }
        }
        Platform::MacOs => CommandSpec {
            program: "open".into(),
            args: vec!["-R".into(), path.as_os_str().to_os_string()],
        },
        Platform::Linux => CommandSpec {
            program: "xdg-open".into(),
            args: vec![
                path.parent()
                    .unwrap_or(path)
                    .as_os_str()
                    .to_os_string(),
            ],
        },
    }
}

/// Starts a planned command without waiting on it.
pub trait Launcher {
    fn launch(&self, spec: &CommandSpec) -> Result<()>;
}

/// Spawns the command in its own session with null stdio and reaps it on a
/// background thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedLauncher;

impl Launcher for DetachedLauncher {
    fn launch(&self, spec: &CommandSpec) -> Result<()> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut command);

        debug!(command = %spec.to_shell_line(), "spawning");
        let mut child = command.spawn().map_err(|err| CatalogError::Launch {
            program: spec.program.to_string_lossy().into_owned(),
            message: err.to_string(),
        })?;
        info!(program = %spec.program.to_string_lossy(), pid = child.id(), "launched");
        thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: setsid is async-signal-safe and touches no parent state.
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}

/// Fail with `Launch` unless `program` resolves to an executable file.
pub fn ensure_program_available(program: &OsStr) -> Result<()> {
    let as_path = Path::new(program);
    let found = if as_path.components().count() > 1 || as_path.is_absolute() {
        is_executable(as_path)
    } else {
        find_on_path(program).is_some()
    };
    if found {
        return Ok(());
    }
    Err(CatalogError::Launch {
        program: program.to_string_lossy().into_owned(),
        message: "not found; install it or point POCDEX_SCANNER at it".to_string(),
    })
}

pub fn find_on_path(name: &OsStr) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    for dir in env::split_paths(&paths) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if is_executable(&exe) {
                return Some(exe);
            }
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            return meta.permissions().mode() & 0o111 != 0;
        }
        false
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// POSIX single-quote escaping, leaving plain words untouched.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\"'\"'"))
    }
}

fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
