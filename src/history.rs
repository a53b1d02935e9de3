use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// In-memory list of entered lines, with plain-text file import and export.
///
/// Files hold one entry per line. `append_to_file` only writes entries recorded since the
/// previous append or save.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
    appended: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line. Blank lines are not recorded.
    pub fn append(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return;
        }
        self.entries.push(line.to_string());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with their 1-based index, limited to the last `count` when given.
    pub fn tail(&self, count: Option<usize>) -> impl Iterator<Item = (usize, &str)> {
        let start = match count {
            Some(n) => self.entries.len().saturating_sub(n),
            None => 0,
        };
        self.entries
            .iter()
            .enumerate()
            .skip(start)
            .map(|(i, line)| (i + 1, line.as_str()))
    }

    /// Append every non-blank line of `path` to the history. Returns how many were read.
    ///
    /// Loaded lines do not count as new for [`History::append_to_file`] unless unwritten
    /// entries precede them.
    pub fn load_from_file(&mut self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("history: {}", path.display()))?;
        let before = self.entries.len();
        for line in content.lines() {
            self.append(line);
        }
        if self.appended == before {
            self.appended = self.entries.len();
        }
        Ok(self.entries.len() - before)
    }

    /// Overwrite `path` with the whole history.
    pub fn save_to_file(&mut self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("history: {}", path.display()))?;
        for line in &self.entries {
            writeln!(file, "{}", line)?;
        }
        self.appended = self.entries.len();
        Ok(())
    }

    /// Append the entries recorded since the last append or save to `path`.
    pub fn append_to_file(&mut self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("history: {}", path.display()))?;
        for line in &self.entries[self.appended..] {
            writeln!(file, "{}", line)?;
        }
        self.appended = self.entries.len();
        Ok(())
    }
}
