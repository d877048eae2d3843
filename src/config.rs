//! Runtime settings.
//!
//! Values come from `POCDEX_*` environment variables with fixed fallbacks;
//! the CLI layers its own flags on top. Empty variables count as unset.

use crate::catalog::DEFAULT_PAGE_SIZE;
use std::env;
use std::env::VarError;
use std::ffi::OsString;
use std::path::PathBuf;

pub const ENV_SCANNER: &str = "POCDEX_SCANNER";
pub const ENV_TERMINAL: &str = "POCDEX_TERMINAL";
pub const ENV_HISTORY: &str = "POCDEX_HISTORY";
pub const ENV_TARGETS_FILE: &str = "POCDEX_TARGETS_FILE";
pub const ENV_WORKSPACE_DIR: &str = "POCDEX_WORKSPACE_DIR";

const DEFAULT_SCANNER: &str = "nuclei";
const DEFAULT_TERMINAL: &str = "x-terminal-emulator";
const HISTORY_FILE_NAME: &str = ".pocdex_history";
const TARGETS_FILE_NAME: &str = "pocdex-targets.txt";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub scanner: OsString,
    pub terminal: OsString,
    pub history_file: PathBuf,
    pub targets_file: PathBuf,
    pub workspace_parent: PathBuf,
    pub page_size: usize,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match env::var(key) {
            Ok(value) => Some(value),
            Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(os)) => Some(os.to_string_lossy().into_owned()),
        })
    }

    /// Resolve settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let temp = env::temp_dir();
        let home = get("HOME")
            .or_else(|| get("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| temp.clone());

        Self {
            scanner: get(ENV_SCANNER)
                .unwrap_or_else(|| DEFAULT_SCANNER.to_string())
                .into(),
            terminal: get(ENV_TERMINAL)
                .unwrap_or_else(|| DEFAULT_TERMINAL.to_string())
                .into(),
            history_file: get(ENV_HISTORY)
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join(HISTORY_FILE_NAME)),
            targets_file: get(ENV_TARGETS_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(|| temp.join(TARGETS_FILE_NAME)),
            workspace_parent: get(ENV_WORKSPACE_DIR)
                .map(PathBuf::from)
                .unwrap_or(temp),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
