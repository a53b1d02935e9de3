//! Tab completion of command names for the interactive editor.

use crate::builtin::BuiltinRegistry;
use crate::resolver::{self, SearchPath};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::collections::BTreeSet;
use std::fs;

/// Every name that can start a command line: builtins plus executables found on `search_path`.
pub fn vocabulary(search_path: &SearchPath, builtins: &BuiltinRegistry) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = builtins.names().map(String::from).collect();
    for dir in search_path.dirs() {
        // Stale PATH entries are common; skip what can't be listed.
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if resolver::is_executable(&entry.path()) {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
    }
    names
}

/// Editor helper completing the first word of the line against a fixed vocabulary.
pub struct ShellHelper {
    vocabulary: BTreeSet<String>,
}

impl ShellHelper {
    pub fn new(vocabulary: BTreeSet<String>) -> Self {
        Self { vocabulary }
    }

    /// Names starting with `prefix`, each followed by a space.
    pub fn candidates(&self, prefix: &str) -> Vec<Pair> {
        self.vocabulary
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| Pair {
                display: name.clone(),
                replacement: format!("{name} "),
            })
            .collect()
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let before_cursor = &line[..pos];
        let start = before_cursor.len() - before_cursor.trim_start().len();
        let word = &before_cursor[start..];
        if word.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        Ok((start, self.candidates(word)))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}
