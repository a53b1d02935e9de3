use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::interpreter::Factory;
use crate::resolver::{self, CommandClass, SearchPath};
use crate::session::Session;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::collections::BTreeSet;
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command, writing to `stdout` and updating the session.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;

    /// Errors from commands that answer `true` end the session instead of being printed.
    fn errors_are_fatal() -> bool {
        false
    }
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        match T::execute(*self, stdout, session) {
            Ok(x) => Ok(x),
            Err(e) if T::errors_are_fatal() => Err(e),
            Err(e) => {
                writeln!(stdout, "{:#}", e)?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        stdout.write_all(self.output.as_bytes())?;
        if !self.output.ends_with('\n') {
            writeln!(stdout)?;
        }
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

/// Fixed set of command names the shell handles itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltinRegistry {
    names: BTreeSet<&'static str>,
}

impl BuiltinRegistry {
    pub fn new(names: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.iter().copied()
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        let cwd = std::env::current_dir().context("pwd")?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; a leading ~ stands for $HOME. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let target = match self.target {
            Some(t) if !t.is_empty() => session.env.expand_tilde(&t),
            _ => match session.env.get_var("HOME") {
                Some(home) => home,
                None => return Err(anyhow::anyhow!("cd: HOME not set")),
            },
        };

        if let Err(e) = std::env::set_current_dir(Path::new(&target)) {
            let reason = match e.kind() {
                ErrorKind::NotFound => "No such file or directory".to_string(),
                ErrorKind::NotADirectory => "Not a directory".to_string(),
                ErrorKind::PermissionDenied => "Permission denied".to_string(),
                _ => e.to_string(),
            };
            writeln!(stdout, "cd: {}: {}", target, reason)?;
            return Ok(1);
        }
        log::debug!("working directory is now {target}");
        Ok(0)
    }
}

/// Exit the shell with the given status, 0 by default.
///
/// The status is taken raw so that negative numbers and anything else starting with `-`
/// reach the numeric parse instead of being read as flags.
pub struct Exit {
    pub code: Option<String>,
}

impl FromArgs for Exit {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            code: args.first().map(|arg| arg.to_string()),
        })
    }
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let code = match self.code {
            Some(raw) => raw
                .parse::<ExitCode>()
                .with_context(|| format!("exit: {raw}: numeric argument required"))?,
            None => 0,
        };
        session.request_exit(code);
        Ok(code)
    }

    fn errors_are_fatal() -> bool {
        true
    }
}

/// Write the arguments to standard output, separated by single spaces and followed by a newline.
///
/// Arguments arrive already split and unquoted, so quoted whitespace survives while runs of
/// unquoted whitespace collapse. Every argument is printed, including ones that look like flags.
pub struct Echo {
    pub words: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            words: args.iter().map(|arg| arg.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.words.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Describe how each name would be interpreted as a command.
pub struct Type {
    #[argh(positional, greedy)]
    /// command names to look up.
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let search_path = SearchPath::from_env(&session.env);
        let mut code = 0;
        for name in &self.names {
            match resolver::resolve(name, &search_path, &session.builtins) {
                CommandClass::Builtin(_) => writeln!(stdout, "{} is a shell builtin", name)?,
                CommandClass::ExternalFound(path) => {
                    writeln!(stdout, "{} is {}", name, path.display())?
                }
                CommandClass::ExternalNotFound | CommandClass::RedirectionPassthrough => {
                    writeln!(stdout, "{}: not found", name)?;
                    code = 1;
                }
            }
        }
        Ok(code)
    }
}

#[derive(FromArgs)]
/// Display the command history, or read it from / write it to a file.
pub struct History {
    #[argh(option, short = 'r')]
    /// append the contents of this file to the history list.
    pub read: Option<String>,

    #[argh(option, short = 'w')]
    /// overwrite this file with the history list.
    pub write: Option<String>,

    #[argh(option, short = 'a')]
    /// append the lines entered since the last append to this file.
    pub append: Option<String>,

    #[argh(positional)]
    /// list only the last N entries.
    pub count: Option<usize>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let history = &mut session.history;
        if let Some(path) = &self.read {
            history.load_from_file(Path::new(path))?;
            return Ok(0);
        }
        if let Some(path) = &self.write {
            history.save_to_file(Path::new(path))?;
            return Ok(0);
        }
        if let Some(path) = &self.append {
            history.append_to_file(Path::new(path))?;
            return Ok(0);
        }
        for (index, line) in history.tail(self.count) {
            writeln!(stdout, "{:>5}  {}", index, line)?;
        }
        Ok(0)
    }
}
