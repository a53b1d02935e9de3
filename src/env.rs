use std::collections::HashMap;
use std::env as stdenv;

/// User-level view of the process environment used by the interpreter.
///
/// Lookups go to the session's own overrides first and then to the live process environment,
/// so a variable such as `PATH` is re-read every time it is needed. Overrides are also handed
/// to every spawned child process.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Create an environment with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in the overrides first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable for this session only.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Session overrides, in no particular order.
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace a leading `~` with the value of `HOME`.
    ///
    /// Paths without a leading tilde, or a missing `HOME`, leave the input untouched.
    pub fn expand_tilde(&self, path: &str) -> String {
        match (path.strip_prefix('~'), self.get_var("HOME")) {
            (Some(rest), Some(home)) => format!("{home}{rest}"),
            _ => path.to_string(),
        }
    }
}
