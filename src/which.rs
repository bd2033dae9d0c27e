//! Locating the compiler executable.

use std::path::{Path, PathBuf};

use crate::error::CompileError;

/// Resolve `command` to an executable file.
///
/// A command that already names an executable file is returned as an
/// absolute path. Anything else is searched for on `PATH`, honoring
/// `PATHEXT` on Windows.
pub fn find_executable(command: &Path) -> Result<PathBuf, CompileError> {
    if is_executable_file(command) {
        if let Ok(path) = std::fs::canonicalize(command) {
            tracing::trace!(path = %path.display(), "compiler command names an executable");
            return Ok(path);
        }
    }

    match which::which(command) {
        Ok(path) => {
            tracing::trace!(
                command = %command.display(),
                path = %path.display(),
                "resolved compiler on PATH"
            );
            Ok(path)
        }
        Err(err) => {
            tracing::trace!(command = %command.display(), error = %err, "compiler not found");
            Err(CompileError::ExecutableNotFound {
                name: command.display().to_string(),
            })
        }
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}
