//! Resource path checks and host-to-renderer path translation

use crate::config::LaunchMode;
use crate::error::{Result, SeatError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Fail with a configuration error unless `path` is an existing regular file
pub fn check_path_is_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SeatError::Configuration(format!(
            "required file not found: {}",
            path.display()
        )))
    }
}

/// Read a list file: one path per non-empty line, each of which must exist
pub fn read_path_list(list_file: &Path) -> Result<Vec<PathBuf>> {
    check_path_is_file(list_file)?;
    let contents = std::fs::read_to_string(list_file)?;
    let paths = contents
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect::<Vec<_>>();
    for path in &paths {
        check_path_is_file(path)?;
    }
    tracing::debug!(list = %list_file.display(), count = paths.len(), "Read path list");
    Ok(paths)
}

/// Maps a path on this host to the path the renderer sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTranslator {
    /// Renderer shares this host's filesystem view
    Identity,
    /// Renderer runs inside WSL; translate with `wslpath`
    Wsl,
}

impl From<LaunchMode> for PathTranslator {
    fn from(mode: LaunchMode) -> Self {
        match mode {
            LaunchMode::Wsl => PathTranslator::Wsl,
            LaunchMode::Native => PathTranslator::Identity,
        }
    }
}

impl PathTranslator {
    pub fn translate(self, path: &Path) -> Result<String> {
        match self {
            PathTranslator::Identity => Ok(path.to_string_lossy().into_owned()),
            PathTranslator::Wsl => wslpath(path),
        }
    }
}

/// Quote `s` as a single POSIX shell word
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn wslpath(path: &Path) -> Result<String> {
    let script = format!("wslpath {}", shell_quote(&path.to_string_lossy()));
    let output = Command::new("wsl")
        .args(["bash", "-c", &script])
        .output()
        .map_err(|e| SeatError::Configuration(format!("cannot run wsl: {}", e)))?;

    if !output.status.success() {
        tracing::error!(
            %script,
            stderr = %String::from_utf8_lossy(&output.stderr),
            "Path conversion using wslpath failed"
        );
        return Err(SeatError::Configuration(format!(
            "wslpath failed for {}",
            path.display()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}
