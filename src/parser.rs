//! Positional grammar for redirection and pipe tokens.
//!
//! The grammar is deliberately rigid:
//!
//! ```text
//! [< file] program args... [| program args...]* [> file | > > file]
//! ```
//!
//! Validation runs over the flat token sequence and, once it passes, the same
//! pass's findings are used to split the line into stages. Nothing downstream
//! looks at `|`, `<` or `>` tokens again.

use crate::command::{BuiltinKind, Command, Invocation, OutputMode, Redirection};
use crate::error::SyntaxError;
use crate::lexer::{PIPE, REDIRECT_IN, REDIRECT_OUT, is_special};

/// Where the operators of a valid token sequence sit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// `<` at position 0, file at position 1.
    pub input: bool,
    /// `>` or `> >` just before the final (file) token.
    pub output: Option<OutputMode>,
    /// Positions of every `|` token.
    pub pipes: Vec<usize>,
}

impl Layout {
    pub fn has_operators(&self) -> bool {
        self.input || self.output.is_some() || !self.pipes.is_empty()
    }

    /// Index of the program token of the first stage.
    pub fn program_position(&self) -> usize {
        if self.input { 2 } else { 0 }
    }

    /// One past the last token that belongs to a stage.
    fn stages_end(&self, count: usize) -> usize {
        match self.output {
            None => count,
            Some(OutputMode::Truncate) => count - 2,
            Some(OutputMode::Append) => count - 3,
        }
    }
}

/// Check the positions of every `<`, `>` and `|` token.
///
/// All tokens are inspected before reporting, and input errors win over output
/// errors, which win over pipe errors.
pub fn validate(tokens: &[String]) -> Result<Layout, SyntaxError> {
    let count = tokens.len();
    let mut layout = Layout::default();
    let mut input_err = false;
    let mut output_err = false;
    let mut pipe_err = false;
    let mut outputs = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token.as_str() {
            REDIRECT_IN => {
                if count < 3 || i != 0 {
                    input_err = true;
                } else {
                    layout.input = true;
                }
            }
            REDIRECT_OUT => {
                if count < 3 || i == 0 {
                    output_err = true;
                } else if i == count - 3 {
                    // first half of `> >`
                    if tokens[i + 1] == REDIRECT_OUT {
                        outputs += 1;
                    } else {
                        output_err = true;
                    }
                } else if i == count - 2 {
                    outputs += 1;
                } else {
                    output_err = true;
                }
            }
            PIPE => {
                if i == 0 || i == count - 1 || tokens[i - 1] == PIPE {
                    pipe_err = true;
                } else {
                    layout.pipes.push(i);
                }
            }
            _ => {}
        }
    }

    layout.output = match outputs {
        0 => None,
        1 => Some(OutputMode::Truncate),
        _ => Some(OutputMode::Append),
    };

    if layout.input && !input_err {
        // `< file` must be followed by a command, and the file must be a word
        if is_special(&tokens[1]) || tokens[2] == REDIRECT_OUT {
            input_err = true;
        }
    }
    if layout.output.is_some() && is_special(&tokens[count - 1]) {
        output_err = true;
    }
    if !input_err && !output_err && !pipe_err && !layout.pipes.is_empty() {
        let start = layout.program_position();
        let end = layout.stages_end(count);
        pipe_err = start >= end || tokens[start..end].split(|t| t == PIPE).any(<[String]>::is_empty);
    }

    if input_err {
        Err(SyntaxError::Input)
    } else if output_err {
        Err(SyntaxError::Output)
    } else if pipe_err {
        Err(SyntaxError::Pipe)
    } else {
        Ok(layout)
    }
}

/// Validate `tokens` and build the [`Command`] they describe.
///
/// Returns `Ok(None)` for an empty token sequence.
pub fn parse(tokens: &[String]) -> Result<Option<Command>, SyntaxError> {
    if tokens.is_empty() {
        return Ok(None);
    }

    let layout = validate(tokens)?;
    let count = tokens.len();
    let start = layout.program_position();
    let program = &tokens[start];

    if let Some(kind) = BuiltinKind::from_name(program) {
        if layout.has_operators() {
            return Err(SyntaxError::BuiltinRedirection(program.clone()));
        }
        return Ok(Some(Command::Builtin {
            kind,
            args: tokens[1..].to_vec(),
        }));
    }

    let stages = tokens[start..layout.stages_end(count)]
        .split(|t| t == PIPE)
        .map(<[String]>::to_vec)
        .collect();

    let redirection = Redirection {
        input: layout.input.then(|| tokens[1].clone()),
        output: layout.output.map(|mode| (tokens[count - 1].clone(), mode)),
    };

    Ok(Some(Command::External(Invocation {
        stages,
        redirection,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::split_into_tokens;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn invocation(line: &str) -> Invocation {
        match parse(&split_into_tokens(line)) {
            Ok(Some(Command::External(inv))) => inv,
            other => panic!("expected external command for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_pipe_positions() {
        assert_eq!(validate(&words(&["|", "a"])), Err(SyntaxError::Pipe));
        assert_eq!(validate(&words(&["a", "|"])), Err(SyntaxError::Pipe));
        assert_eq!(validate(&words(&["a", "|", "|", "b"])), Err(SyntaxError::Pipe));
        assert_eq!(validate(&words(&["a", "|", "b"])).unwrap().pipes, vec![1]);
    }

    #[test]
    fn test_output_positions() {
        let layout = validate(&words(&["a", "b", ">", "out"])).unwrap();
        assert_eq!(layout.output, Some(OutputMode::Truncate));

        let layout = validate(&words(&["a", "b", ">", ">", "out"])).unwrap();
        assert_eq!(layout.output, Some(OutputMode::Append));

        assert_eq!(validate(&words(&[">", "a", "b"])), Err(SyntaxError::Output));
        assert_eq!(validate(&words(&["a", ">"])), Err(SyntaxError::Output));
        assert_eq!(validate(&words(&["a", ">", "b", "c"])), Err(SyntaxError::Output));
        assert_eq!(validate(&words(&["a", ">", "b", ">", "c"])), Err(SyntaxError::Output));
    }

    #[test]
    fn test_input_positions() {
        assert!(validate(&words(&["<", "in", "cat"])).unwrap().input);
        assert_eq!(validate(&words(&["<", "in"])), Err(SyntaxError::Input));
        assert_eq!(validate(&words(&["cat", "<", "in"])), Err(SyntaxError::Input));
        assert_eq!(validate(&words(&["<", "in", ">", "out"])), Err(SyntaxError::Input));
    }

    #[test]
    fn test_error_priority() {
        // both an input and a pipe error: input is reported
        assert_eq!(validate(&words(&["a", "<", "b", "|"])), Err(SyntaxError::Input));
        // output and pipe: output is reported
        assert_eq!(validate(&words(&["|", ">", "a", "b"])), Err(SyntaxError::Output));
    }

    #[test]
    fn test_empty_stage_next_to_redirection() {
        assert_eq!(validate(&split_into_tokens("a | > f")), Err(SyntaxError::Pipe));
        assert_eq!(validate(&split_into_tokens("< f | b")), Err(SyntaxError::Pipe));
    }

    #[test]
    fn test_empty_line_is_noop() {
        assert_eq!(parse(&[]), Ok(None));
    }

    #[test]
    fn test_builtin_classification() {
        assert_eq!(
            parse(&words(&["cd", "/tmp"])),
            Ok(Some(Command::Builtin {
                kind: BuiltinKind::Cd,
                args: words(&["/tmp"]),
            }))
        );
        assert_eq!(
            parse(&split_into_tokens("history > out")),
            Err(SyntaxError::BuiltinRedirection("history".into()))
        );
        assert_eq!(
            parse(&split_into_tokens("< in pwd")),
            Err(SyntaxError::BuiltinRedirection("pwd".into()))
        );
        assert_eq!(
            parse(&split_into_tokens("! | wc")),
            Err(SyntaxError::BuiltinRedirection("!".into()))
        );
    }

    #[test]
    fn test_stages_and_redirection() {
        let inv = invocation("< in.txt sort -r | uniq -c | head -n 3 >> out.txt");
        assert_eq!(
            inv.stages,
            vec![
                words(&["sort", "-r"]),
                words(&["uniq", "-c"]),
                words(&["head", "-n", "3"]),
            ]
        );
        assert_eq!(inv.redirection.input.as_deref(), Some("in.txt"));
        assert_eq!(
            inv.redirection.output,
            Some(("out.txt".to_string(), OutputMode::Append))
        );
    }

    #[test]
    fn test_stage_count_matches_pipe_count() {
        let line = "a | b c | d | e f g";
        let pipes = validate(&split_into_tokens(line)).unwrap().pipes.len();
        assert_eq!(invocation(line).stages.len(), pipes + 1);
    }

    #[test]
    fn test_plain_command() {
        let inv = invocation("ls -l /");
        assert_eq!(inv.stages, vec![words(&["ls", "-l", "/"])]);
        assert!(inv.redirection.is_empty());
        assert!(!inv.is_pipeline());
    }
}
