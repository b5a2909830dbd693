use std::fmt;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Commands interpreted by the shell itself instead of being spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Pwd,
    Cd,
    History,
    Exit,
    /// `!` / `! N` history recall.
    Bang,
}

impl BuiltinKind {
    /// Classify a program token; `None` means it names an external program.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pwd" => Some(BuiltinKind::Pwd),
            "cd" => Some(BuiltinKind::Cd),
            "history" => Some(BuiltinKind::History),
            "exit" => Some(BuiltinKind::Exit),
            "!" => Some(BuiltinKind::Bang),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Pwd => "pwd",
            BuiltinKind::Cd => "cd",
            BuiltinKind::History => "history",
            BuiltinKind::Exit => "exit",
            BuiltinKind::Bang => "!",
        }
    }
}

impl fmt::Display for BuiltinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an output redirection opens its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// `>`: create or truncate.
    Truncate,
    /// `> >`: create or append.
    Append,
}

/// Standard stream substitutions requested for a command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirection {
    /// File bound to the first stage's standard input.
    pub input: Option<String>,
    /// File bound to the last stage's standard output.
    pub output: Option<(String, OutputMode)>,
}

impl Redirection {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}

/// An external command line split into stages, not yet resolved to executables.
///
/// Each stage is its full argument vector, program name first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub stages: Vec<Vec<String>>,
    pub redirection: Redirection,
}

impl Invocation {
    pub fn is_pipeline(&self) -> bool {
        self.stages.len() > 1
    }
}

/// One parsed input line, classified once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Builtin {
        kind: BuiltinKind,
        /// Arguments after the builtin's name.
        args: Vec<String>,
    },
    External(Invocation),
}
