use crate::command::ExitCode;
use crate::error::{Result, ShellError};
use nix::unistd::{AccessFlags, access};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Resolve a program token to an executable file.
///
/// Behavior:
/// - Token containing a `/` (absolute or relative): used verbatim.
/// - Otherwise: each directory of `search_path` is tried in order and the
///   first candidate that qualifies wins.
///
/// A candidate qualifies when it exists, is a regular file and is executable
/// by this process. An empty token never resolves.
pub fn resolve(program: &str, search_path: &[PathBuf]) -> Result<PathBuf> {
    let found = if program.contains('/') {
        let path = Path::new(program);
        is_executable(path).then(|| path.to_path_buf())
    } else if program.is_empty() {
        None
    } else {
        find_in_path(search_path, program)
    };

    match found {
        Some(path) => {
            tracing::debug!(program, executable = %path.display(), "resolved external command");
            Ok(path)
        }
        None => Err(ShellError::CommandNotFound(program.to_string())),
    }
}

fn find_in_path(search_path: &[PathBuf], program: &str) -> Option<PathBuf> {
    search_path
        .iter()
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

/// Exists, is a regular file, and passes `access(X_OK)`.
pub fn is_executable(path: &Path) -> bool {
    path.metadata().is_ok_and(|m| m.is_file()) && access(path, AccessFlags::X_OK).is_ok()
}

/// Exit code of a finished child, with signals mapped the way shells do.
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}
