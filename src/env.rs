use crate::command::ExitCode;
use std::env as stdenv;
use std::path::PathBuf;

/// Directories searched when no `PATH` variable is present.
pub const DEFAULT_PATH: &str = "/bin:/usr/bin";

/// File name of the history log inside the home directory.
pub const HISTORY_FILE_NAME: &str = ".msh_history";

/// Explicit view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: environment variables, in their original order, handed unmodified
///   to every spawned child.
/// - `search_path`: directories probed, in order, to resolve bare program names.
/// - `current_dir`: the working directory for command execution.
/// - `exit_request`: set by the `exit` builtin; a REPL loop checks it to know
///   when to terminate and with which status.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: Vec<(String, String)>,
    pub search_path: Vec<PathBuf>,
    pub current_dir: PathBuf,
    pub exit_request: Option<ExitCode>,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// The search path comes from `PATH`, or [`DEFAULT_PATH`] when it is unset.
    pub fn new() -> Self {
        let vars: Vec<(String, String)> = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let path = stdenv::var("PATH").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        Self {
            vars,
            search_path: stdenv::split_paths(&path).collect(),
            current_dir,
            exit_request: None,
        }
    }

    /// Build an environment from explicit parts.
    pub fn with_parts(
        vars: Vec<(String, String)>,
        search_path: Vec<PathBuf>,
        current_dir: PathBuf,
    ) -> Self {
        Self {
            vars,
            search_path,
            current_dir,
            exit_request: None,
        }
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or override a variable, keeping its position if it already exists.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        let key = key.into();
        let val = val.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = val,
            None => self.vars.push((key, val)),
        }
    }

    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_var("HOME").map(PathBuf::from)
    }

    /// Well-known location of the history log: `$HOME/.msh_history`.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.home_dir().map(|home| home.join(HISTORY_FILE_NAME))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
