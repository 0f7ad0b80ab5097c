use std::io;
use thiserror::Error;

use crate::lexer::LexError;
use crate::parser::SyntaxError;

/// Everything a statement can fail with. All variants are recovered at the
/// statement boundary: the interactive loop prints one diagnostic line and
/// continues with the next input line.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("ncsh: Could not run command: {0}")]
    CommandNotFound(io::Error),

    #[error("{path}: {source}")]
    Redirection { path: String, source: io::Error },

    #[error("ncsh: Could not run command: {0}")]
    ChildProcess(io::Error),
}

impl ShellError {
    /// Exit status reported for a statement that failed with this error.
    pub fn status(&self) -> i32 {
        match self {
            ShellError::Lex(_) | ShellError::Syntax(_) => 2,
            ShellError::CommandNotFound(_) => 127,
            _ => 1,
        }
    }
}
