use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed redirection or pipe grammar in a token sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// `<` outside position 0, or without a file and a command after it.
    #[error("invalid input redirection")]
    Input,
    /// `>` / `> >` anywhere but right before the final token.
    #[error("invalid output redirection")]
    Output,
    /// `|` at either end of the line, or an empty stage between two pipes.
    #[error("invalid pipe")]
    Pipe,
    /// A builtin combined with any redirection or pipe token.
    #[error("{0}: I/O redirection not permitted for builtin commands")]
    BuiltinRedirection(String),
}

/// Coarse classification of every failure the interpreter can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Resolution,
    Permission,
    Os,
    Argument,
    HistoryRange,
}

/// Every error that aborts processing of a single input line.
///
/// None of these terminate the interpreter: the caller reports the message
/// (which already carries the failing command, file or subsystem as a prefix)
/// and moves on to the next line.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("{0}: command not found")]
    CommandNotFound(String),

    #[error("{}: No such file or directory", .0.display())]
    NoSuchFile(PathBuf),

    #[error("{}: Permission denied", .0.display())]
    PermissionDenied(PathBuf),

    #[error("{context}: {source}")]
    Os {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{command}: {message}")]
    Argument { command: String, message: String },

    #[error("!: invalid history reference")]
    HistoryRange,
}

impl ShellError {
    pub(crate) fn os(context: impl Into<String>, source: io::Error) -> Self {
        ShellError::Os {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn argument(command: impl Into<String>, message: impl Into<String>) -> Self {
        ShellError::Argument {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ShellError::Syntax(_) => ErrorKind::Syntax,
            ShellError::CommandNotFound(_) | ShellError::NoSuchFile(_) => ErrorKind::Resolution,
            ShellError::PermissionDenied(_) => ErrorKind::Permission,
            ShellError::Os { .. } => ErrorKind::Os,
            ShellError::Argument { .. } => ErrorKind::Argument,
            ShellError::HistoryRange => ErrorKind::HistoryRange,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
