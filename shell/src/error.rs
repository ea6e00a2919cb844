//! Error types for the shell.
//!
//! Every error is local to one input line: the interpreter reports it and
//! goes back to the prompt.

use crate::lexer::Token;
use thiserror::Error;

/// Why a token sequence could not be turned into a command sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line had no tokens at all.
    #[error("empty command")]
    EmptyCommand,

    /// `|`, `&&` or `||` with no command before it.
    #[error("'{0}' unexpected")]
    UnexpectedOperator(Token),

    /// `<` or `>` not followed by a file name.
    #[error("expected filename after '{0}'")]
    ExpectedFilename(Token),

    /// The line ended right after a connecting operator.
    #[error("unexpected end of line after '{0}'")]
    UnexpectedEnd(Token),

    /// A command made only of redirections.
    #[error("missing command before redirection")]
    MissingCommand,

    /// A redirection that would replace a pipe end inside a pipeline.
    #[error("'{0}' is only allowed on the {1} command of a pipeline")]
    MisplacedRedirect(Token, &'static str),
}

/// Errors that abandon the rest of the current line.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("{program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
