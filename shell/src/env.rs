use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env as stdenv;
use std::fs;
use std::path::{Path, PathBuf};

/// Process context shared by the substitutor, the built-ins and the runner.
///
/// The environment contains:
/// - `vars`: variables visible to `$NAME` substitution and to spawned programs.
/// - `current_dir`: the working directory for command execution.
/// - `should_exit`: set by the `exit` built-in; the read loop stops once it is true.
///
/// Fields are public so tests can build an isolated context without touching
/// the real process environment.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, the interpreter stops after the current built-in.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment`.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    /// Get the value of a variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override a variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Resolve `path` against the current directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }

    /// Change both the process and the context working directory.
    ///
    /// On failure nothing is changed.
    pub fn change_dir(&mut self, target: impl AsRef<Path>) -> Result<&Path> {
        let new_dir = self.resolve_path(target);
        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("{}", new_dir.display()))?;
        stdenv::set_current_dir(&canonical)
            .with_context(|| format!("{}", canonical.display()))?;
        self.current_dir = canonical;
        Ok(&self.current_dir)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
