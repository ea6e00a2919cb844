use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::ShellError;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Locate the executable for `name` using the `PATH` of `env`.
///
/// Names with a directory part are taken relative to `env.current_dir`, not
/// the process working directory. The result is absolute so it does not
/// depend on the child's working directory.
pub fn resolve_program(env: &Environment, name: &str) -> Result<PathBuf, ShellError> {
    let search_paths = env.get_var("PATH").unwrap_or_default();
    let path = Path::new(name);
    let path = if path.components().nth(1).is_some() {
        Cow::Owned(env.resolve_path(path))
    } else {
        Cow::Borrowed(path)
    };
    find_command_path(OsStr::new(&search_paths), &path)
        .map(|found| env.resolve_path(found))
        .ok_or_else(|| ShellError::CommandNotFound(name.to_string()))
}

/// Convert a child's status to a shell exit code.
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

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`): returns it if it exists.
/// - `./foo` on Unix or any `./`-prefixed path on other platforms: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.is_file() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| path.is_file())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.is_file() { Some(path) } else { None }
}
