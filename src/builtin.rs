use crate::command::{BuiltinKind, ExitCode};
use crate::env::Environment;
use crate::error::{Result, ShellError};
use crate::history::{DEFAULT_HISTORY_SHOWN, HistoryRef, HistoryStore};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// State a builtin may read or change.
pub struct Context<'a> {
    pub env: &'a mut Environment,
    pub history: &'a HistoryStore,
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "pwd" or "cd".
    fn name() -> &'static str;

    /// Executes the command against the interpreter state.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode>;
}

/// Outcome of parsing a builtin's arguments.
#[derive(Debug, PartialEq, Eq)]
pub enum Parsed<T> {
    Run(T),
    /// `--help` was given; holds the usage text.
    Help(String),
}

fn parse<T: FromArgs>(name: &str, args: &[String]) -> Result<Parsed<T>> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match T::from_args(&[name], &args) {
        Ok(cmd) => Ok(Parsed::Run(cmd)),
        Err(EarlyExit { output, status }) => match status {
            Ok(()) => Ok(Parsed::Help(output)),
            Err(()) => Err(ShellError::argument(name, output.trim())),
        },
    }
}

fn invoke<T: BuiltinCommand>(
    args: &[String],
    stdout: &mut dyn Write,
    ctx: &mut Context<'_>,
) -> Result<ExitCode> {
    match parse::<T>(T::name(), args)? {
        Parsed::Run(cmd) => {
            let code = cmd.execute(stdout, ctx)?;
            tracing::debug!(builtin = T::name(), code, "builtin finished");
            Ok(code)
        }
        Parsed::Help(usage) => {
            write!(stdout, "{usage}").map_err(write_error)?;
            Ok(0)
        }
    }
}

/// Run builtin `kind` with the arguments that followed its name.
pub fn run(
    kind: BuiltinKind,
    args: &[String],
    stdout: &mut dyn Write,
    ctx: &mut Context<'_>,
) -> Result<ExitCode> {
    match kind {
        BuiltinKind::Pwd => invoke::<Pwd>(args, stdout, ctx),
        BuiltinKind::Cd => invoke::<Cd>(args, stdout, ctx),
        BuiltinKind::History => invoke::<History>(args, stdout, ctx),
        BuiltinKind::Exit => invoke::<Exit>(args, stdout, ctx),
        // a reference is only valid as the start of a line, where the
        // interpreter substitutes it before parsing
        BuiltinKind::Bang => match parse_bang(args)? {
            Parsed::Run(_) => Err(ShellError::argument(
                BuiltinKind::Bang.name(),
                "history reference not allowed here",
            )),
            Parsed::Help(usage) => {
                write!(stdout, "{usage}").map_err(write_error)?;
                Ok(0)
            }
        },
    }
}

/// Parse the arguments of a `!` reference.
pub fn parse_bang(args: &[String]) -> Result<Parsed<HistoryRef>> {
    let name = BuiltinKind::Bang.name();
    Ok(match parse::<Bang>(name, args)? {
        Parsed::Run(bang) => Parsed::Run(match bang.seq {
            None => HistoryRef::Last,
            Some(seq) => HistoryRef::Seq(numeric(name, &seq)?),
        }),
        Parsed::Help(usage) => Parsed::Help(usage),
    })
}

fn numeric<N: std::str::FromStr>(command: &str, arg: &str) -> Result<N> {
    arg.parse()
        .map_err(|_| ShellError::argument(command, format!("{arg}: numeric argument required")))
}

fn write_error(e: std::io::Error) -> ShellError {
    ShellError::os("stdout", e)
}

#[derive(FromArgs)]
/// Print the current working directory.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode> {
        writeln!(
            stdout,
            "current directory is '{}'",
            ctx.env.current_dir.display()
        )
        .map_err(write_error)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode> {
        let target = match self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => ctx
                .env
                .home_dir()
                .ok_or_else(|| ShellError::argument("cd", "HOME not set"))?,
        };

        // `join` keeps an absolute target as is
        let new_dir = ctx.env.current_dir.join(&target);
        let context = format!("cd: {}", target.display());
        let canonical = fs::canonicalize(&new_dir).map_err(|e| ShellError::os(&context, e))?;

        env::set_current_dir(&canonical).map_err(|e| ShellError::os(&context, e))?;
        tracing::debug!(dir = %canonical.display(), "changed directory");
        ctx.env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the most recent commands, oldest first.
pub struct History {
    #[argh(positional)]
    /// how many entries to show (default 10)
    pub count: Option<String>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode> {
        let count = match &self.count {
            Some(n) => numeric(Self::name(), n)?,
            None => DEFAULT_HISTORY_SHOWN,
        };
        for entry in ctx.history.list_prior(count) {
            writeln!(stdout, "{}: {}", entry.seq, entry.line).map_err(write_error)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional)]
    /// status to exit with (default 0)
    pub code: Option<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode> {
        let code = match &self.code {
            Some(c) => numeric(Self::name(), c)?,
            None => 0,
        };
        ctx.env.exit_request = Some(code);
        Ok(code)
    }
}

#[derive(FromArgs)]
/// Re-run a command from the history log.
pub struct Bang {
    #[argh(positional)]
    /// sequence number of the command; the most recent one when omitted
    pub seq: Option<String>,
}
