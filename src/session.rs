use crate::builtin::BuiltinRegistry;
use crate::command::ExitCode;
use crate::env::Environment;
use crate::history::History;

/// Mutable state of one interactive shell session.
///
/// Everything a builtin may read or change lives here, so independent sessions never share
/// state apart from the process working directory.
#[derive(Debug, Clone)]
pub struct Session {
    /// Variable lookups and per-session overrides (PATH, HOME, ...).
    pub env: Environment,
    /// Lines entered so far.
    pub history: History,
    /// Names handled in-process.
    pub builtins: BuiltinRegistry,
    exit_request: Option<ExitCode>,
}

impl Session {
    pub fn new(env: Environment, builtins: BuiltinRegistry) -> Self {
        Self {
            env,
            history: History::new(),
            builtins,
            exit_request: None,
        }
    }

    /// Ask the read loop to stop after the current line and exit with `code`.
    pub fn request_exit(&mut self, code: ExitCode) {
        self.exit_request = Some(code);
    }

    /// Exit status requested by `exit`, if any.
    pub fn exit_request(&self) -> Option<ExitCode> {
        self.exit_request
    }
}
