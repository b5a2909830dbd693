//! Lexical analysis: splits one input line into words.
//!
//! There is no quoting. Words are runs of non-separator characters, and each
//! special character (`!`, `<`, `>`, `|`) always becomes a word of its own,
//! whether or not it is surrounded by whitespace.

/// Characters that delimit words.
pub const WORD_SEPARATORS: &str = " \t\r\n";

/// Characters that are returned as words by themselves.
pub const SPECIAL_CHARS: &str = "!><|";

pub const BANG: &str = "!";
pub const REDIRECT_IN: &str = "<";
pub const REDIRECT_OUT: &str = ">";
pub const PIPE: &str = "|";

/// Returns true if `token` is one of the single-character special words.
pub fn is_special(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => SPECIAL_CHARS.contains(c),
        _ => false,
    }
}

/// Split `line` into tokens.
///
/// Leading runs of `separators` are skipped. A token is the longest run of
/// non-separator characters, cut short right before the first character from
/// `specials`; if the run *starts* with a special character the token is that
/// one character.
///
/// ```
/// use msh::lexer::{tokenize, SPECIAL_CHARS, WORD_SEPARATORS};
/// assert_eq!(
///     tokenize("a>>b", WORD_SEPARATORS, SPECIAL_CHARS),
///     vec!["a", ">", ">", "b"]
/// );
/// ```
pub fn tokenize(line: &str, separators: &str, specials: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = line;

    loop {
        rest = rest.trim_start_matches(|c: char| separators.contains(c));
        let Some(first) = rest.chars().next() else {
            break;
        };

        let len = if specials.contains(first) {
            first.len_utf8()
        } else {
            rest.find(|c: char| separators.contains(c) || specials.contains(c))
                .unwrap_or(rest.len())
        };

        let (token, tail) = rest.split_at(len);
        tokens.push(token.to_string());
        rest = tail;
    }

    tokens
}

/// Tokenize with the interpreter's default separators and special characters.
pub fn split_into_tokens(line: &str) -> Vec<String> {
    tokenize(line, WORD_SEPARATORS, SPECIAL_CHARS)
}
