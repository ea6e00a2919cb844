//! A small line-oriented command shell.
//!
//! Each input line goes through `$NAME` substitution, tokenization and parsing
//! into a sequence of commands joined by `|`, `&&` and `||`, with optional `<`
//! and `>` redirections. The sequence is then executed: a lone built-in
//! (`cd`, `pwd`, `echo`, `kill`, `ps`, `exit`) runs in-process, everything
//! else is spawned as a pipeline of child processes.
//!
//! The main entry point is [`Interpreter`]. The stages are public so they can
//! be used on their own: [`substitute::substitute`], [`lexer::tokenize`],
//! [`parser::parse`] and [`runner::Runner`].

pub mod builtin;
pub mod command;
pub mod env;
pub mod error;
pub mod external;
mod interpreter;
#[cfg(test)]
mod io_adapters;
pub mod lexer;
pub mod parser;
pub mod reader;
pub mod runner;
pub mod substitute;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{DEFAULT_PROMPT, Interpreter, LineOutcome};
