//! The core of a small interactive command shell.
//!
//! A line typed at the prompt is split into words ([`lexer`]), may be replaced
//! by a command from the persistent log ([`history`]), has its glob patterns
//! expanded ([`expansion`]) and its pipe and redirection operators checked
//! ([`parser`]). What remains is either a builtin ([`builtin`]) run in-process
//! or a pipeline of external programs ([`external`], [`orchestrator`]).
//!
//! The main entry point is [`Interpreter`], which runs that sequence for one
//! line at a time against an explicit [`env::Environment`].

pub mod builtin;
pub mod command;
pub mod env;
pub mod error;
pub mod expansion;
pub mod external;
pub mod history;
mod interpreter;
pub mod lexer;
pub mod orchestrator;
pub mod parser;

/// Just a convenient re-export of the line interpreter.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
