use crate::env::Environment;
use std::path::PathBuf;

/// Runtime settings of the interactive shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Printed before every input line.
    pub prompt: String,
    /// Shell that receives lines containing redirections or pipes, as `<host_shell> -c <line>`.
    pub host_shell: PathBuf,
    /// History is loaded from this file at start-up and written back when the loop ends.
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: "$ ".to_string(),
            host_shell: PathBuf::from("/bin/sh"),
            history_file: None,
        }
    }
}

impl Config {
    /// Defaults, with the history file taken from a non-empty `HISTFILE`.
    pub fn from_env(env: &Environment) -> Self {
        Self {
            history_file: env
                .get_var("HISTFILE")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            ..Self::default()
        }
    }
}
