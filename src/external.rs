use crate::command::ExitCode;
use crate::env::Environment;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Starts programs on behalf of the interpreter.
///
/// Children inherit the shell's standard streams and the interpreter blocks until they exit.
pub trait Launcher {
    /// Run `program` with `argv` (whose first element is the name the user typed).
    fn spawn_and_wait(
        &mut self,
        program: &Path,
        argv: &[String],
        env: &Environment,
    ) -> Result<ExitCode>;

    /// Hand a whole line to the host shell, e.g. because it contains redirections or pipes.
    fn passthrough(&mut self, line: &str, env: &Environment) -> Result<ExitCode>;
}

/// [`Launcher`] backed by `std::process`, delegating passthrough lines to a POSIX shell.
pub struct HostLauncher {
    host_shell: PathBuf,
}

impl HostLauncher {
    pub fn new(host_shell: impl Into<PathBuf>) -> Self {
        Self {
            host_shell: host_shell.into(),
        }
    }

    fn run(mut cmd: Command, env: &Environment) -> Result<ExitCode> {
        let mut child = cmd
            .envs(env.overrides())
            .spawn()
            .with_context(|| format!("failed to spawn {:?}", cmd.get_program()))?;
        let exit_status = child.wait()?;
        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

impl Launcher for HostLauncher {
    fn spawn_and_wait(
        &mut self,
        program: &Path,
        argv: &[String],
        env: &Environment,
    ) -> Result<ExitCode> {
        let mut cmd = Command::new(program);
        if let Some(name) = argv.first() {
            set_arg0(&mut cmd, name);
        }
        cmd.args(argv.iter().skip(1));
        let code = Self::run(cmd, env)?;
        log::debug!("{} exited with {}", program.display(), code);
        Ok(code)
    }

    fn passthrough(&mut self, line: &str, env: &Environment) -> Result<ExitCode> {
        log::debug!("passing through to {}: {}", self.host_shell.display(), line);
        let mut cmd = Command::new(&self.host_shell);
        cmd.arg("-c").arg(line);
        Self::run(cmd, env)
    }
}

/// The child sees the name the user typed as `argv[0]`, not the resolved path.
#[cfg(unix)]
fn set_arg0(cmd: &mut Command, name: &str) {
    use std::os::unix::process::CommandExt;
    cmd.arg0(name);
}

#[cfg(not(unix))]
fn set_arg0(_cmd: &mut Command, _name: &str) {}

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
