#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Drop a do-nothing executable that stands in for the scanner.
pub fn fake_scanner(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("fake-scanner");
    fs::write(&path, "#!/bin/sh\nexit 0\n")?;
    make_executable(&path)?;
    Ok(path)
}
