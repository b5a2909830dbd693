use crate::builtin::{self, Context, Parsed};
use crate::command::{BuiltinKind, Command, ExitCode};
use crate::env::Environment;
use crate::error::{Result, ShellError, SyntaxError};
use crate::expansion::expand;
use crate::history::HistoryStore;
use crate::lexer::{BANG, split_into_tokens};
use crate::orchestrator::Orchestrator;
use crate::parser;
use std::io::{self, Write};

/// A line-at-a-time shell interpreter.
///
/// Each line goes through the same steps: tokenize, substitute a history
/// reference, expand glob patterns, validate, record in the history log, and
/// finally run the builtin or external command it names. A failure at any step
/// abandons that line only.
///
/// Example
/// ```
/// use msh::Interpreter;
/// use msh::env::Environment;
/// use msh::history::HistoryStore;
///
/// let mut sh = Interpreter::new(Environment::new(), HistoryStore::in_memory());
/// let mut out = Vec::new();
/// sh.run_line("exit 4", &mut out).unwrap();
/// assert!(sh.should_exit());
/// assert_eq!(sh.exit_status(), 4);
/// ```
pub struct Interpreter {
    env: Environment,
    history: HistoryStore,
    orchestrator: Orchestrator,
}

impl Interpreter {
    pub fn new(env: Environment, history: HistoryStore) -> Self {
        Self {
            env,
            history,
            orchestrator: Orchestrator::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Number of external processes started by this interpreter.
    pub fn spawn_count(&self) -> usize {
        self.orchestrator.spawn_count()
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.exit_request.is_some()
    }

    /// Status requested by `exit`, 0 if it has not run.
    pub fn exit_status(&self) -> ExitCode {
        self.env.exit_request.unwrap_or(0)
    }

    /// Run one input line, writing recalled commands, builtin output and
    /// status lines to `out`.
    ///
    /// Returns `Ok(None)` when the line holds no command.
    pub fn run_line(&mut self, line: &str, out: &mut dyn Write) -> Result<Option<ExitCode>> {
        let mut tokens = split_into_tokens(line);
        if tokens.is_empty() {
            return Ok(None);
        }

        if tokens[0] == BANG {
            match self.substitute_history(&tokens, out)? {
                Some(recalled) => tokens = recalled,
                None => return Ok(Some(0)),
            }
        }
        // recorded before glob expansion so a recalled line globs again
        let recorded = tokens.join(" ");

        if let Some(expanded) = expand(&tokens, self.env.home_dir().as_deref()) {
            tracing::trace!(?expanded, "expanded glob patterns");
            tokens = expanded;
        }

        let Some(command) = parser::parse(&tokens)? else {
            return Ok(None);
        };

        if let Err(e) = self.history.record(&recorded) {
            eprintln!("{e}");
        }

        let code = match command {
            Command::Builtin { kind, args } => {
                let mut ctx = Context {
                    env: &mut self.env,
                    history: &self.history,
                };
                builtin::run(kind, &args, out, &mut ctx)?
            }
            Command::External(invocation) => {
                self.orchestrator.dispatch(&invocation, &self.env, out)?
            }
        };
        Ok(Some(code))
    }

    /// Run one line against the process's stdout, reporting any failure on
    /// stderr. Returns the status of the line (1 after a failure).
    pub fn execute_line(&mut self, line: &str) -> ExitCode {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        match self.run_line(line, &mut out) {
            Ok(code) => code.unwrap_or(0),
            Err(e) => {
                let _ = out.flush();
                tracing::debug!(kind = ?e.kind(), "line failed");
                eprintln!("{e}");
                1
            }
        }
    }

    /// Replace a leading `!` reference with the recalled command's tokens.
    ///
    /// Returns `None` if only the usage text was requested.
    fn substitute_history(
        &self,
        tokens: &[String],
        out: &mut dyn Write,
    ) -> Result<Option<Vec<String>>> {
        if parser::validate(tokens)?.has_operators() {
            return Err(SyntaxError::BuiltinRedirection(BANG.to_string()).into());
        }

        let reference = match builtin::parse_bang(&tokens[1..])? {
            Parsed::Run(reference) => reference,
            Parsed::Help(usage) => {
                write!(out, "{usage}").map_err(|e| ShellError::os("stdout", e))?;
                return Ok(None);
            }
        };
        let recalled = self.history.recall(reference)?;
        tracing::debug!(?reference, recalled, "history substitution");
        writeln!(out, "{recalled}").map_err(|e| ShellError::os("stdout", e))?;

        let tokens = split_into_tokens(recalled);
        if tokens.first().is_some_and(|t| t == BANG) {
            return Err(ShellError::argument(
                BuiltinKind::Bang.name(),
                "recalled command is itself a history reference",
            ));
        }
        Ok(Some(tokens))
    }
}
