//! Word splitting for input lines, following POSIX-like quoting and escaping rules.
//!
//! The splitter never fails: an unterminated quote simply extends to the end of the input,
//! and a trailing backslash outside of quotes is dropped.

/// Controls what happens to the quote characters themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteMode {
    /// Quote characters delimit literal text and are consumed.
    #[default]
    Strip,
    /// Quote characters are kept in the produced words. All other rules are unchanged.
    Preserve,
}

/// Which quotes are currently open and whether the previous character was an escaping backslash.
#[derive(Debug, Clone, Copy, Default)]
struct QuoteState {
    inside_single: bool,
    inside_double: bool,
    escaped: bool,
}

/// Characters that a backslash escapes inside double quotes.
const DOUBLE_QUOTE_ESCAPABLE: [char; 4] = ['"', '\\', '$', '`'];

struct WordSplitter {
    mode: QuoteMode,
    state: QuoteState,
    words: Vec<String>,
    current: String,
}

impl WordSplitter {
    fn new(mode: QuoteMode) -> Self {
        WordSplitter {
            mode,
            state: QuoteState::default(),
            words: Vec::new(),
            current: String::new(),
        }
    }

    /// Feeds every character of `line` through the state machine and returns the finished words.
    fn split(mut self, line: &str) -> Vec<String> {
        for ch in line.chars() {
            if self.state.escaped {
                self.handle_escaped(ch);
            } else if self.state.inside_single {
                self.handle_single_quote(ch);
            } else if self.state.inside_double {
                self.handle_double_quote(ch);
            } else {
                self.handle_unquoted(ch);
            }
        }

        // A dangling backslash inside double quotes escapes nothing, so it stays literal.
        if self.state.escaped && self.state.inside_double {
            self.current.push('\\');
        }
        self.finish_word();
        self.words
    }

    fn handle_escaped(&mut self, ch: char) {
        self.state.escaped = false;
        if self.state.inside_double && !DOUBLE_QUOTE_ESCAPABLE.contains(&ch) {
            self.current.push('\\');
        }
        self.current.push(ch);
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => {
                self.state.inside_single = false;
                self.push_quote(ch);
            }
            c => self.current.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => {
                self.state.inside_double = false;
                self.push_quote(ch);
            }
            '\\' => self.state.escaped = true,
            c => self.current.push(c),
        }
    }

    fn handle_unquoted(&mut self, ch: char) {
        match ch {
            '\'' => {
                self.state.inside_single = true;
                self.push_quote(ch);
            }
            '"' => {
                self.state.inside_double = true;
                self.push_quote(ch);
            }
            '\\' => self.state.escaped = true,
            c if c.is_whitespace() => self.finish_word(),
            c => self.current.push(c),
        }
    }

    fn push_quote(&mut self, quote: char) {
        if self.mode == QuoteMode::Preserve {
            self.current.push(quote);
        }
    }

    fn finish_word(&mut self) {
        if !self.current.is_empty() {
            self.words.push(std::mem::take(&mut self.current));
        }
    }
}

/// Splits `line` into fully unescaped words.
///
/// Words are separated by runs of unquoted whitespace. Quoted and unquoted fragments that touch
/// each other form a single word, so `'foo'bar` yields `foobar`.
pub fn split_words(line: &str) -> Vec<String> {
    split_words_with(line, QuoteMode::Strip)
}

/// Splits `line` into words, choosing whether quote characters are kept.
///
/// # Arguments
/// * `line` - The raw text to split.
/// * `mode` - [`QuoteMode::Strip`] for an argument vector, [`QuoteMode::Preserve`] when the
///   quoting has to survive for a later consumer.
pub fn split_words_with(line: &str, mode: QuoteMode) -> Vec<String> {
    WordSplitter::new(mode).split(line)
}
