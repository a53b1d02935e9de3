//! A small interactive shell front-end.
//!
//! Each input line is split into words following POSIX-like quoting rules, the first word is
//! resolved to a builtin or to an executable on `PATH`, and the command is run. Lines containing
//! redirection or pipe operators are handed to the host shell untouched.
//!
//! The main entry point is [`Interpreter`], which owns a [`Session`] and dispatches lines one at
//! a time. The [`lexer`] and [`resolver`] modules can be used on their own.

mod builtin;
pub mod command;
pub mod completion;
pub mod config;
pub mod env;
pub mod external;
pub mod history;
mod interpreter;
pub mod lexer;
pub mod resolver;
pub mod session;
#[cfg(test)]
mod testutil;

pub use builtin::BuiltinRegistry;
pub use config::Config;
pub use interpreter::{
    Classified, DispatchOutcome, Interpreter, classify, default_builtins, has_redirection,
    split_command_line,
};
pub use session::Session;
