use crate::builtin::BuiltinRegistry;
use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::completion::{self, ShellHelper};
use crate::config::Config;
use crate::env::Environment;
use crate::external::{HostLauncher, Launcher};
use crate::lexer;
use crate::resolver::{self, CommandClass, SearchPath};
use crate::session::Session;
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::io::Write;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, i.e. builtins.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Operators that make a line go to the host shell untouched.
///
/// Every multi-character operator contains `>` or `|`, so this also covers `>>`, `1>`, `2>>` etc.
const REDIRECTION_OPERATORS: [&str; 7] = [">", ">>", "1>", "2>", "1>>", "2>>", "|"];

/// What happened to one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The line was blank.
    Empty,
    /// A builtin ran with the given status.
    BuiltinHandled(ExitCode),
    /// An external program ran and exited with the given status.
    ExternalRan(ExitCode),
    /// The host shell ran the line and exited with the given status.
    PassedThrough(ExitCode),
    /// No builtin or executable has this name.
    NotFound(String),
}

/// A line after classification: how to run it and the argument vector to run it with.
///
/// `argv[0]` is the command name. Passthrough lines carry an empty `argv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub class: CommandClass,
    pub argv: Vec<String>,
}

/// Whether `line` contains a redirection or pipe operator anywhere, quoted or not.
pub fn has_redirection(line: &str) -> bool {
    REDIRECTION_OPERATORS.iter().any(|op| line.contains(op))
}

/// Turn a trimmed line into an argument vector.
///
/// A line starting with a quote is split as a whole, since the command name itself may be
/// quoted. Otherwise the first whitespace-delimited word is taken verbatim as the command and
/// only the remainder goes through word splitting.
pub fn split_command_line(trimmed: &str) -> Vec<String> {
    if trimmed.starts_with(['\'', '"']) {
        return lexer::split_words(trimmed);
    }
    let (name, rest) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));
    if name.is_empty() {
        return Vec::new();
    }
    let mut argv = vec![name.to_string()];
    argv.extend(lexer::split_words(rest.trim_start()));
    argv
}

/// Classify a line. Returns `None` for blank lines.
///
/// The checks run in a fixed order: redirection operators first, then argument splitting,
/// then builtin lookup, then the search path.
pub fn classify(line: &str, search_path: &SearchPath, builtins: &BuiltinRegistry) -> Option<Classified> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if has_redirection(trimmed) {
        return Some(Classified {
            class: CommandClass::RedirectionPassthrough,
            argv: Vec::new(),
        });
    }
    let argv = split_command_line(trimmed);
    let name = argv.first()?;
    Some(Classified {
        class: resolver::resolve(name, search_path, builtins),
        argv,
    })
}

/// The builtins this shell ships with.
pub fn default_builtins() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    vec![
        Box::new(Factory::<Echo>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Type>::default()),
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<History>::default()),
    ]
}

/// A line-oriented shell: splits input into words, then runs a builtin, an external program,
/// or hands the line to the host shell.
///
/// The interpreter owns its [`Session`], so several interpreters can coexist in one process.
///
/// Example
/// ```
/// use wordsh::{DispatchOutcome, Interpreter};
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// let outcome = sh.dispatch("echo 'hello   world'", &mut out).unwrap();
/// assert_eq!(outcome, DispatchOutcome::BuiltinHandled(0));
/// assert_eq!(out, b"hello   world\n");
/// ```
pub struct Interpreter {
    config: Config,
    session: Session,
    commands: Vec<Box<dyn CommandFactory>>,
    launcher: Box<dyn Launcher>,
}

impl Interpreter {
    /// Create an interpreter with a custom set of builtins and process launcher.
    pub fn new(
        config: Config,
        env: Environment,
        commands: Vec<Box<dyn CommandFactory>>,
        launcher: Box<dyn Launcher>,
    ) -> Self {
        let builtins = BuiltinRegistry::new(commands.iter().map(|factory| factory.name()));
        Self {
            config,
            session: Session::new(env, builtins),
            commands,
            launcher,
        }
    }

    /// Create an interpreter with the default builtins, launching programs for real.
    pub fn with_config(config: Config, env: Environment) -> Self {
        let launcher = HostLauncher::new(config.host_shell.clone());
        Self::new(config, env, default_builtins(), Box::new(launcher))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Record `line` in the history, then dispatch it.
    pub fn execute_line(&mut self, line: &str, stdout: &mut dyn Write) -> Result<DispatchOutcome> {
        self.session.history.append(line);
        self.dispatch(line, stdout)
    }

    /// Run one input line.
    ///
    /// Only a malformed `exit` status produces an error; every other failure is reported on
    /// `stdout` and reflected in the outcome.
    pub fn dispatch(&mut self, line: &str, stdout: &mut dyn Write) -> Result<DispatchOutcome> {
        let search_path = SearchPath::from_env(&self.session.env);
        let Some(Classified { class, argv }) = classify(line, &search_path, &self.session.builtins)
        else {
            return Ok(DispatchOutcome::Empty);
        };
        log::debug!("classified {:?} as {:?}", line, class);

        match class {
            CommandClass::RedirectionPassthrough => {
                stdout.flush()?;
                let raw = line.trim_end_matches(['\r', '\n']);
                match self.launcher.passthrough(raw, &self.session.env) {
                    Ok(code) => Ok(DispatchOutcome::PassedThrough(code)),
                    Err(e) => {
                        log::warn!("passthrough failed: {:#}", e);
                        writeln!(stdout, "{:#}", e)?;
                        Ok(DispatchOutcome::PassedThrough(127))
                    }
                }
            }
            CommandClass::Builtin(name) => {
                let args: Vec<&str> = argv[1..].iter().map(String::as_str).collect();
                for factory in &self.commands {
                    if let Some(cmd) = factory.try_create(&name, &args) {
                        let code = cmd.execute(stdout, &mut self.session)?;
                        return Ok(DispatchOutcome::BuiltinHandled(code));
                    }
                }
                Err(anyhow::anyhow!("builtin {} has no handler", name))
            }
            CommandClass::ExternalFound(path) => {
                stdout.flush()?;
                match self.launcher.spawn_and_wait(&path, &argv, &self.session.env) {
                    Ok(code) => Ok(DispatchOutcome::ExternalRan(code)),
                    Err(e) => {
                        log::warn!("{}: {:#}", path.display(), e);
                        writeln!(stdout, "{}: {:#}", argv[0], e)?;
                        Ok(DispatchOutcome::ExternalRan(126))
                    }
                }
            }
            CommandClass::ExternalNotFound => {
                writeln!(stdout, "{}: command not found", argv[0])?;
                Ok(DispatchOutcome::NotFound(argv[0].clone()))
            }
        }
    }

    /// Interactive read-eval-print loop.
    ///
    /// Returns the status requested by `exit`, or 0 at end of input. A malformed `exit`
    /// argument ends the loop with an error.
    pub fn repl(&mut self) -> Result<ExitCode> {
        if let Some(path) = self.config.history_file.clone() {
            if let Err(e) = self.session.history.load_from_file(&path) {
                log::warn!("could not load history: {:#}", e);
            }
        }

        let search_path = SearchPath::from_env(&self.session.env);
        let helper = ShellHelper::new(completion::vocabulary(&search_path, &self.session.builtins));
        let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::new()?;
        rl.set_helper(Some(helper));
        for entry in self.session.history.entries() {
            rl.add_history_entry(entry.as_str())?;
        }

        let prompt = self.config.prompt.clone();
        let mut stdout = std::io::stdout();
        let result = loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    if let Err(e) = self.execute_line(&line, &mut stdout) {
                        break Err(e);
                    }
                    if let Some(code) = self.session.exit_request() {
                        break Ok(code);
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break Ok(0),
                Err(err) => break Err(err.into()),
            }
        };

        self.save_history();
        result
    }

    fn save_history(&mut self) {
        if let Some(path) = &self.config.history_file {
            if let Err(e) = self.session.history.save_to_file(path) {
                log::warn!("could not save history: {:#}", e);
            }
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default configuration and builtins:
    /// `echo`, `exit`, `type`, `pwd`, `cd` and `history`.
    fn default() -> Self {
        Self::with_config(Config::default(), Environment::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::lock_current_dir;
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Spawn(PathBuf, Vec<String>),
        Passthrough(String),
    }

    /// Records launches instead of performing them.
    struct RecordingLauncher {
        calls: Rc<RefCell<Vec<Call>>>,
        status: ExitCode,
    }

    impl RecordingLauncher {
        fn with_handle(status: ExitCode) -> (Self, Rc<RefCell<Vec<Call>>>) {
            let calls = Rc::new(RefCell::new(Vec::new()));
            let launcher = Self {
                calls: calls.clone(),
                status,
            };
            (launcher, calls)
        }
    }

    impl Launcher for RecordingLauncher {
        fn spawn_and_wait(
            &mut self,
            program: &Path,
            argv: &[String],
            _env: &Environment,
        ) -> Result<ExitCode> {
            self.calls
                .borrow_mut()
                .push(Call::Spawn(program.to_path_buf(), argv.to_vec()));
            Ok(self.status)
        }

        fn passthrough(&mut self, line: &str, _env: &Environment) -> Result<ExitCode> {
            self.calls
                .borrow_mut()
                .push(Call::Passthrough(line.to_string()));
            Ok(self.status)
        }
    }

    fn interpreter(path: &str) -> (Interpreter, Rc<RefCell<Vec<Call>>>) {
        let (launcher, calls) = RecordingLauncher::with_handle(0);
        let mut env = Environment::new();
        env.set_var("PATH", path);
        let sh = Interpreter::new(Config::default(), env, default_builtins(), Box::new(launcher));
        (sh, calls)
    }

    fn run(sh: &mut Interpreter, line: &str) -> (DispatchOutcome, String) {
        let mut out = Vec::new();
        let outcome = sh.execute_line(line, &mut out).unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[cfg(unix)]
    fn make_exe(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn split_takes_first_word_verbatim() {
        assert_eq!(
            split_command_line("cat  '/tmp/a b'   c"),
            vec!["cat", "/tmp/a b", "c"]
        );
        assert_eq!(split_command_line("pwd"), vec!["pwd"]);
    }

    #[test]
    fn split_quoted_command_name() {
        assert_eq!(
            split_command_line(r#"'exe  with space' "arg one" two"#),
            vec!["exe  with space", "arg one", "two"]
        );
        assert_eq!(split_command_line(r#""my 'exe'"x"#), vec!["my 'exe'x"]);
    }

    #[test]
    fn redirection_detection() {
        for line in ["ls > out", "ls >> out", "ls 1> out", "ls 2>> err", "ls | wc", "echo \"a > b\""] {
            assert!(has_redirection(line), "{line}");
        }
        assert!(!has_redirection("echo plain words"));
    }

    #[test]
    fn classify_order() {
        let builtins = BuiltinRegistry::new(["echo"]);
        let path = SearchPath::default();

        assert_eq!(classify("   ", &path, &builtins), None);
        assert_eq!(
            classify("echo hi > /tmp/x", &path, &builtins).unwrap().class,
            CommandClass::RedirectionPassthrough
        );
        assert_eq!(
            classify("'echo' hi", &path, &builtins).unwrap(),
            Classified {
                class: CommandClass::Builtin("echo".to_string()),
                argv: vec!["echo".to_string(), "hi".to_string()],
            }
        );
        assert_eq!(
            classify("missing_cmd a", &path, &builtins).unwrap().class,
            CommandClass::ExternalNotFound
        );
    }

    #[test]
    fn echo_preserves_quoted_spacing() {
        let (mut sh, _) = interpreter("");
        let (outcome, out) = run(&mut sh, "echo 'hello   world'");
        assert_eq!(outcome, DispatchOutcome::BuiltinHandled(0));
        assert_eq!(out, "hello   world\n");

        let (_, out) = run(&mut sh, r#"echo   one    "two  three"   four\ \ five"#);
        assert_eq!(out, "one two  three four  five\n");
    }

    #[test]
    fn type_reports_builtin() {
        let (mut sh, _) = interpreter("");
        let (_, out) = run(&mut sh, "type cd");
        assert_eq!(out, "cd is a shell builtin\n");
        let (_, out) = run(&mut sh, "type history");
        assert_eq!(out, "history is a shell builtin\n");
    }

    #[test]
    fn cd_to_missing_directory_keeps_cwd() {
        let _lock = lock_current_dir();
        let before = std::env::current_dir().unwrap();
        let (mut sh, _) = interpreter("");

        let (outcome, out) = run(&mut sh, "cd /nonexistent");

        assert_eq!(outcome, DispatchOutcome::BuiltinHandled(1));
        assert_eq!(out, "cd: /nonexistent: No such file or directory\n");
        assert_eq!(std::env::current_dir().unwrap(), before);
        assert_eq!(sh.session().exit_request(), None);
    }

    #[test]
    fn redirection_is_passed_through_verbatim() {
        let (mut sh, calls) = interpreter("");
        let (outcome, out) = run(&mut sh, "ls > /tmp/out.txt");

        assert_eq!(outcome, DispatchOutcome::PassedThrough(0));
        assert!(out.is_empty());
        assert_eq!(
            *calls.borrow(),
            vec![Call::Passthrough("ls > /tmp/out.txt".to_string())]
        );
    }

    #[test]
    fn unknown_command_is_reported() {
        let (mut sh, calls) = interpreter("");
        let (outcome, out) = run(&mut sh, "nonexistent_cmd_xyz --flag");
        assert_eq!(outcome, DispatchOutcome::NotFound("nonexistent_cmd_xyz".to_string()));
        assert_eq!(out, "nonexistent_cmd_xyz: command not found\n");
        assert!(calls.borrow().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn external_command_gets_split_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let exe = make_exe(dir.path(), "custom_exe");
        let (mut sh, calls) = interpreter(&dir.path().to_string_lossy());

        let (outcome, _) = run(&mut sh, r#"custom_exe 'a  b' "c\"d" e\ f"#);

        assert_eq!(outcome, DispatchOutcome::ExternalRan(0));
        assert_eq!(
            *calls.borrow(),
            vec![Call::Spawn(
                exe,
                vec!["custom_exe".into(), "a  b".into(), "c\"d".into(), "e f".into()]
            )]
        );
    }

    #[test]
    #[cfg(unix)]
    fn quoted_command_name_is_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let exe = make_exe(dir.path(), "exe with 'quotes'");
        let (mut sh, calls) = interpreter(&dir.path().to_string_lossy());

        let (outcome, _) = run(&mut sh, r#""exe with 'quotes'" file"#);

        assert_eq!(outcome, DispatchOutcome::ExternalRan(0));
        assert_eq!(
            *calls.borrow(),
            vec![Call::Spawn(exe, vec!["exe with 'quotes'".into(), "file".into()])]
        );
    }

    #[test]
    #[cfg(unix)]
    fn path_changes_take_effect_immediately() {
        let dir = tempfile::tempdir().unwrap();
        make_exe(dir.path(), "late_tool");
        let (mut sh, _) = interpreter("");

        let (outcome, _) = run(&mut sh, "late_tool");
        assert_eq!(outcome, DispatchOutcome::NotFound("late_tool".to_string()));

        sh.session_mut()
            .env
            .set_var("PATH", dir.path().to_string_lossy().to_string());
        let (outcome, _) = run(&mut sh, "late_tool");
        assert_eq!(outcome, DispatchOutcome::ExternalRan(0));
    }

    #[test]
    fn exit_requests_termination() {
        let (mut sh, _) = interpreter("");
        let (outcome, _) = run(&mut sh, "exit 7");
        assert_eq!(outcome, DispatchOutcome::BuiltinHandled(7));
        assert_eq!(sh.session().exit_request(), Some(7));
    }

    #[test]
    fn exit_with_non_numeric_status_is_fatal() {
        let (mut sh, _) = interpreter("");
        let mut out = Vec::new();
        assert!(sh.execute_line("exit abc", &mut out).is_err());
        assert_eq!(sh.session().exit_request(), None);
    }

    #[test]
    fn exit_accepts_negative_status() {
        let (mut sh, _) = interpreter("");
        let (outcome, out) = run(&mut sh, "exit -1");
        assert_eq!(outcome, DispatchOutcome::BuiltinHandled(-1));
        assert_eq!(out, "");
        assert_eq!(sh.session().exit_request(), Some(-1));
    }

    #[test]
    fn exit_with_flag_like_status_is_fatal() {
        let (mut sh, _) = interpreter("");
        let mut out = Vec::new();
        let err = sh.execute_line("exit --foo", &mut out).unwrap_err();
        assert!(format!("{err:#}").contains("numeric argument required"));
        assert_eq!(sh.session().exit_request(), None);
    }

    #[test]
    fn history_append_skips_lines_loaded_from_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("hist");
        let target = dir.path().join("other");
        fs::write(&source, "old one\nold two\n")?;

        let (mut sh, _) = interpreter("");
        sh.session_mut().history.load_from_file(&source)?;
        let line = format!("history -a {}", target.display());
        run(&mut sh, &line);

        assert_eq!(fs::read_to_string(&target)?, format!("{line}\n"));
        Ok(())
    }

    #[test]
    fn history_includes_current_line() {
        let (mut sh, _) = interpreter("");
        run(&mut sh, "echo hello");
        run(&mut sh, "   ");
        let (_, out) = run(&mut sh, "history");
        assert_eq!(out, "    1  echo hello\n    2  history\n");
    }

    #[test]
    fn sessions_are_independent() {
        let (mut first, _) = interpreter("");
        let (second, _) = interpreter("");
        run(&mut first, "echo only here");
        assert_eq!(first.session().history.len(), 1);
        assert!(second.session().history.is_empty());
    }

    #[test]
    fn blank_line_is_empty_outcome() {
        let (mut sh, calls) = interpreter("");
        let (outcome, out) = run(&mut sh, " \t ");
        assert_eq!(outcome, DispatchOutcome::Empty);
        assert!(out.is_empty());
        assert!(calls.borrow().is_empty());
    }
}
