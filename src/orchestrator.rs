//! Spawning, wiring and reaping of external commands.
//!
//! A command line moves through `Parsed -> Resolved -> {Direct | Redirected |
//! Piped} -> Spawned -> Waited -> Idle`. Every stage of a pipeline is its own
//! child process; the only thing shared between them is the set of OS pipes,
//! which this module owns until each end has been handed to its child.

use crate::command::{BuiltinKind, ExitCode, Invocation, OutputMode, Redirection};
use crate::env::Environment;
use crate::error::{Result, ShellError, SyntaxError};
use crate::external::{exit_code, resolve};
use nix::unistd::{AccessFlags, access};
use os_pipe::{PipeReader, PipeWriter};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{self, Child, ExitStatus};

/// Lifecycle phase of the command line currently being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Parsed,
    Resolved,
    Direct,
    Redirected,
    Piped,
    Spawned,
    Waited,
}

/// One external program of a pipeline, resolved to its executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub program: PathBuf,
    /// Full argument vector; `args[0]` is the name as typed.
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    /// Resolve every stage's program; the first failure aborts the whole line.
    pub fn resolve(stages: &[Vec<String>], search_path: &[PathBuf]) -> Result<Self> {
        let stages = stages
            .iter()
            .map(|args| {
                let name = args.first().map(String::as_str).unwrap_or_default();
                Ok(Stage {
                    program: resolve(name, search_path)?,
                    args: args.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { stages })
    }
}

/// Drives external commands from resolution to exit.
#[derive(Debug)]
pub struct Orchestrator {
    phase: Phase,
    spawned: usize,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            spawned: 0,
        }
    }

    pub fn state(&self) -> Phase {
        self.phase
    }

    /// Total number of child processes started so far.
    pub fn spawn_count(&self) -> usize {
        self.spawned
    }

    fn enter(&mut self, phase: Phase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "orchestrator phase");
        self.phase = phase;
    }

    /// Run an external command line, choosing direct, redirected or piped
    /// execution. The status line of the final process is written to `out`.
    pub fn dispatch(
        &mut self,
        invocation: &Invocation,
        env: &Environment,
        out: &mut dyn Write,
    ) -> Result<ExitCode> {
        // anything already written (e.g. a recalled command) goes out before
        // the children start writing to the same stream
        out.flush().map_err(|e| ShellError::os("stdout", e))?;

        let result = if invocation.is_pipeline() {
            self.run_pipeline(&invocation.stages, env, &invocation.redirection, out)
        } else {
            self.run_single(invocation, env, out)
        };
        self.enter(Phase::Idle);
        result
    }

    fn run_single(
        &mut self,
        invocation: &Invocation,
        env: &Environment,
        out: &mut dyn Write,
    ) -> Result<ExitCode> {
        self.enter(Phase::Parsed);
        let args = invocation.stages.first().map(Vec::as_slice).unwrap_or_default();
        let name = args.first().map(String::as_str).unwrap_or_default();
        let program = resolve(name, &env.search_path)?;
        self.enter(Phase::Resolved);

        if invocation.redirection.is_empty() {
            self.run_direct(&program, args, env, out)
        } else {
            self.run_redirected(&program, args, env, &invocation.redirection, out)
        }
    }

    /// Spawn one child sharing this process's standard streams and wait for it.
    pub fn run_direct(
        &mut self,
        program: &Path,
        args: &[String],
        env: &Environment,
        out: &mut dyn Write,
    ) -> Result<ExitCode> {
        self.enter(Phase::Direct);
        let cmd = command_for(program, args, env);
        let mut child = self.spawn(cmd, program)?;
        let status = self.wait(&mut child)?;
        report(out, program, status)
    }

    /// Spawn one child with its standard input and/or output bound to files.
    ///
    /// The files are checked before anything is spawned: the input must exist
    /// and be readable, an existing output must be writable.
    pub fn run_redirected(
        &mut self,
        program: &Path,
        args: &[String],
        env: &Environment,
        redirection: &Redirection,
        out: &mut dyn Write,
    ) -> Result<ExitCode> {
        self.enter(Phase::Redirected);
        check_redirection(redirection)?;

        let mut cmd = command_for(program, args, env);
        if let Some(input) = &redirection.input {
            cmd.stdin(open_input(Path::new(input))?);
        }
        if let Some((output, mode)) = &redirection.output {
            cmd.stdout(open_output(Path::new(output), *mode)?);
        }

        let mut child = self.spawn(cmd, program)?;
        let status = self.wait(&mut child)?;
        report(out, program, status)
    }

    /// Run `stages` connected by pipes; only the last stage's status is reported.
    ///
    /// Nothing is spawned if a stage names a builtin, a program cannot be
    /// resolved, or a redirection file fails its checks. If a later stage
    /// fails to start, the stages already running are still waited for.
    pub fn run_pipeline(
        &mut self,
        stages: &[Vec<String>],
        env: &Environment,
        redirection: &Redirection,
        out: &mut dyn Write,
    ) -> Result<ExitCode> {
        self.enter(Phase::Parsed);
        if stages.is_empty() {
            return Ok(0);
        }
        let builtin = stages
            .iter()
            .filter_map(|args| args.first())
            .find(|name| BuiltinKind::from_name(name).is_some());
        if let Some(name) = builtin {
            return Err(SyntaxError::BuiltinRedirection(name.clone()).into());
        }

        let pipeline = Pipeline::resolve(stages, &env.search_path)?;
        self.enter(Phase::Resolved);
        check_redirection(redirection)?;
        self.enter(Phase::Piped);

        let mut children = Vec::with_capacity(pipeline.stages.len());
        let spawned = self.spawn_pipeline(&pipeline, env, redirection, &mut children);
        // the parent's pipe ends are all closed by now, so no child can block
        // waiting for a writer that will never come
        let waited = self.wait_all(&mut children);
        spawned?;
        let statuses = waited?;

        let last = pipeline.stages.len() - 1;
        match statuses.last() {
            Some(&status) if statuses.len() == pipeline.stages.len() => {
                report(out, &pipeline.stages[last].program, status)
            }
            _ => Ok(0),
        }
    }

    fn spawn_pipeline(
        &mut self,
        pipeline: &Pipeline,
        env: &Environment,
        redirection: &Redirection,
        children: &mut Vec<Child>,
    ) -> Result<()> {
        let last = pipeline.stages.len() - 1;
        let mut readers: Vec<Option<PipeReader>> = Vec::with_capacity(last);
        let mut writers: Vec<Option<PipeWriter>> = Vec::with_capacity(last);
        for _ in 0..last {
            let (reader, writer) = os_pipe::pipe().map_err(|e| ShellError::os("pipe", e))?;
            readers.push(Some(reader));
            writers.push(Some(writer));
        }
        tracing::debug!(pipes = last, "allocated pipes");

        for (k, stage) in pipeline.stages.iter().enumerate() {
            let mut cmd = command_for(&stage.program, &stage.args, env);

            if k > 0 {
                if let Some(reader) = readers[k - 1].take() {
                    cmd.stdin(reader);
                }
            } else if let Some(input) = &redirection.input {
                cmd.stdin(open_input(Path::new(input))?);
            }

            if k < last {
                if let Some(writer) = writers[k].take() {
                    cmd.stdout(writer);
                }
            } else if let Some((output, mode)) = &redirection.output {
                cmd.stdout(open_output(Path::new(output), *mode)?);
            }

            // `spawn` consumes `cmd`, closing the parent's copy of both ends
            children.push(self.spawn(cmd, &stage.program)?);
        }
        Ok(())
    }

    fn spawn(&mut self, mut cmd: process::Command, program: &Path) -> Result<Child> {
        let child = cmd
            .spawn()
            .map_err(|e| ShellError::os(program.display().to_string(), e))?;
        drop(cmd);
        self.spawned += 1;
        self.enter(Phase::Spawned);
        tracing::debug!(pid = child.id(), program = %program.display(), "spawned");
        Ok(child)
    }

    fn wait(&mut self, child: &mut Child) -> Result<ExitStatus> {
        let status = child.wait().map_err(|e| ShellError::os("wait", e))?;
        self.enter(Phase::Waited);
        tracing::debug!(pid = child.id(), %status, "child exited");
        Ok(status)
    }

    /// Wait for every child even if one of the waits fails.
    fn wait_all(&mut self, children: &mut [Child]) -> Result<Vec<ExitStatus>> {
        let mut statuses = Vec::with_capacity(children.len());
        let mut first_err = None;
        for child in children.iter_mut() {
            match self.wait(child) {
                Ok(status) => statuses.push(status),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(statuses),
        }
    }
}

fn command_for(program: &Path, args: &[String], env: &Environment) -> process::Command {
    let mut cmd = process::Command::new(program);
    if let Some((arg0, rest)) = args.split_first() {
        cmd.arg0(arg0).args(rest);
    }
    cmd.env_clear()
        .envs(env.vars.iter().map(|(k, v)| (k, v)))
        .current_dir(&env.current_dir);
    cmd
}

/// Print `<program> exit status = <code>` for a child that exited normally.
fn report(out: &mut dyn Write, program: &Path, status: ExitStatus) -> Result<ExitCode> {
    if let Some(code) = status.code() {
        writeln!(out, "{} exit status = {}", program.display(), code)
            .and_then(|_| out.flush())
            .map_err(|e| ShellError::os("stdout", e))?;
    }
    Ok(exit_code(status))
}

fn check_redirection(redirection: &Redirection) -> Result<()> {
    if let Some(input) = &redirection.input {
        check_input(Path::new(input))?;
    }
    if let Some((output, _)) = &redirection.output {
        check_output(Path::new(output))?;
    }
    Ok(())
}

fn check_input(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ShellError::NoSuchFile(path.to_path_buf()));
        }
        Err(e) => return Err(ShellError::os(path.display().to_string(), e)),
    }
    access(path, AccessFlags::R_OK).map_err(|_| ShellError::PermissionDenied(path.to_path_buf()))
}

fn check_output(path: &Path) -> Result<()> {
    if path.exists() && access(path, AccessFlags::W_OK).is_err() {
        return Err(ShellError::PermissionDenied(path.to_path_buf()));
    }
    Ok(())
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| ShellError::os(path.display().to_string(), e))
}

fn open_output(path: &Path, mode: OutputMode) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(0o644);
    match mode {
        OutputMode::Truncate => options.truncate(true),
        OutputMode::Append => options.append(true),
    };
    options
        .open(path)
        .map_err(|e| ShellError::os(path.display().to_string(), e))
}
