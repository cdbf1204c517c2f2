//! Startup check that the retrieval program can be found.
//!
//! Nothing is installed on demand: a missing program is a configuration
//! error reported before the server starts.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{RetrievalError, RetrievalResult};

/// Resolve `program` to an executable file.
///
/// A value containing a path separator is checked as given; a bare name is
/// searched on `PATH`.
pub fn resolve_program(program: &Path) -> RetrievalResult<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return if is_executable(program) {
            Ok(program.to_path_buf())
        } else {
            Err(RetrievalError::ProgramNotFound(program.display().to_string()))
        };
    }

    env::var_os("PATH")
        .iter()
        .flat_map(env::split_paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(|| RetrievalError::ProgramNotFound(program.display().to_string()))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
