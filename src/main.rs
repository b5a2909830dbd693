//! msh entry point.
//!
//! Usage:
//!   msh                          # interactive prompt, or one command per stdin line
//!   msh -c <command>             # run one command line and exit with its status
//!   msh --history-file <path>    # use another history log

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use argh::FromArgs;
use msh::Interpreter;
use msh::env::Environment;
use msh::history::HistoryStore;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const PROMPT: &str = "msh> ";

#[derive(FromArgs)]
/// A small command shell with pipes, redirection and a persistent history.
struct Args {
    #[argh(option)]
    /// history log to use instead of $HOME/.msh_history
    history_file: Option<PathBuf>,

    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status
    command: Option<String>,
}

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var); stdout belongs to commands
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args: Args = argh::from_env();
    match run(args) {
        Ok(code) => ExitCode::from((code & 0xff) as u8),
        Err(e) => {
            eprintln!("msh: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<i32> {
    let env = Environment::new();
    let history = match args.history_file.or_else(|| env.history_path()) {
        Some(path) => HistoryStore::open(&path).unwrap_or_else(|e| {
            eprintln!("{e}");
            HistoryStore::in_memory()
        }),
        None => HistoryStore::in_memory(),
    };
    let mut sh = Interpreter::new(env, history);

    if let Some(line) = args.command {
        let code = sh.execute_line(&line);
        return Ok(if sh.should_exit() { sh.exit_status() } else { code });
    }

    if io::stdin().is_terminal() {
        repl(&mut sh)?;
    } else {
        run_stdin(&mut sh)?;
    }
    Ok(sh.exit_status())
}

fn repl(sh: &mut Interpreter) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    while !sh.should_exit() {
        match rl.readline(PROMPT) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                sh.execute_line(&line);
            }
            // drop the partial line, keep the shell
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err).context("failed to read line"),
        }
    }

    Ok(())
}

fn run_stdin(sh: &mut Interpreter) -> Result<()> {
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        sh.execute_line(&line);
        if sh.should_exit() {
            break;
        }
    }
    Ok(())
}
