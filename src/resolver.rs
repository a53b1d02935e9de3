//! Command lookup: decides whether a name is a builtin and otherwise finds an executable for it.

use crate::builtin::BuiltinRegistry;
use crate::env::Environment;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// How a command line is going to be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandClass {
    /// The command is handled in-process.
    Builtin(String),
    /// An executable file was found for the command.
    ExternalFound(PathBuf),
    /// Neither a builtin nor an executable on the search path.
    ExternalNotFound,
    /// The line contains redirection or pipe operators and goes to the host shell as-is.
    RedirectionPassthrough,
}

/// Ordered list of directories searched for executables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dirs: dirs.into_iter().collect(),
        }
    }

    /// Parse a colon-separated list of directories. Empty entries are skipped.
    pub fn parse(value: &OsStr) -> Self {
        Self::new(std::env::split_paths(value).filter(|dir| !dir.as_os_str().is_empty()))
    }

    /// Read `PATH` from the environment. A missing variable gives an empty search path.
    pub fn from_env(env: &Environment) -> Self {
        env.get_var("PATH")
            .map(|value| Self::parse(OsStr::new(&value)))
            .unwrap_or_default()
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

/// Classify `command`: builtins win without touching the filesystem, then the search path is
/// scanned in order and the first executable match is reported.
pub fn resolve(command: &str, search_path: &SearchPath, builtins: &BuiltinRegistry) -> CommandClass {
    if builtins.contains(command) {
        return CommandClass::Builtin(command.to_string());
    }
    match find_executable(command, search_path) {
        Some(path) => {
            log::debug!("resolved {command} to {}", path.display());
            CommandClass::ExternalFound(path)
        }
        None => CommandClass::ExternalNotFound,
    }
}

/// Find the executable file that `command` refers to.
///
/// Behavior:
/// - Empty name: returns `None`.
/// - Name containing a path separator (e.g. `/bin/sh`, `./run`, `bin/tool`): the path itself is
///   checked, relative to the current directory when not absolute.
/// - Plain name: each directory in `search_path` is tried in order and the first regular,
///   executable file named `command` directly inside it wins.
pub fn find_executable(command: &str, search_path: &SearchPath) -> Option<PathBuf> {
    if command.is_empty() {
        return None;
    }

    let path = Path::new(command);
    if command.contains(std::path::MAIN_SEPARATOR) {
        return is_executable(path).then(|| path.to_path_buf());
    }

    search_path
        .dirs()
        .iter()
        .map(|dir| dir.join(path))
        .find(|candidate| is_executable(candidate))
}

/// Whether `path` is a regular file (after following symlinks) that may be executed.
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    has_execute_permission(&metadata)
}

#[cfg(unix)]
fn has_execute_permission(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_permission(_metadata: &std::fs::Metadata) -> bool {
    true
}
