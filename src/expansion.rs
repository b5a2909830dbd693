//! Filesystem pattern expansion of command arguments.
//!
//! Any argument containing `*`, `?`, `[` or `~` is matched against the
//! filesystem. A pattern that matches nothing is passed through unchanged.

use crate::lexer::split_into_tokens;
use glob::{MatchOptions, glob_with};
use std::collections::BTreeSet;
use std::path::Path;

const GLOB_CHARS: [char; 4] = ['*', '?', '[', '~'];

fn needs_expansion(token: &str) -> bool {
    token.contains(GLOB_CHARS)
}

/// Replace a leading `~` (alone or before `/`) with `home`.
fn expand_tilde(token: &str, home: Option<&Path>) -> Option<String> {
    let rest = token.strip_prefix('~')?;
    if !(rest.is_empty() || rest.starts_with('/')) {
        return None;
    }
    let home = home?;
    Some(format!("{}{}", home.display(), rest))
}

/// Sorted, deduplicated matches for one pattern, or the pattern itself when
/// nothing matches.
fn expand_token(token: &str, home: Option<&Path>) -> Vec<String> {
    let pattern = expand_tilde(token, home).unwrap_or_else(|| token.to_string());

    // hidden entries only match a pattern that spells out the leading dot
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let matches: BTreeSet<String> = match glob_with(&pattern, options) {
        Ok(paths) => paths
            .filter_map(Result::ok)
            .map(|p| p.to_string_lossy().into_owned())
            .collect(),
        Err(e) => {
            tracing::debug!(pattern = %pattern, "invalid glob pattern: {}", e);
            BTreeSet::new()
        }
    };

    if matches.is_empty() {
        vec![token.to_string()]
    } else {
        matches.into_iter().collect()
    }
}

/// Expand every glob pattern among the arguments of `tokens`.
///
/// Returns `None` when no argument contains a glob metacharacter, in which case
/// the filesystem is never touched. Otherwise each pattern is replaced in place
/// by its matches, the words are joined with single spaces and the result is
/// tokenized again. The program word (position 0) is never expanded.
pub fn expand(tokens: &[String], home: Option<&Path>) -> Option<Vec<String>> {
    if !tokens.iter().skip(1).any(|t| needs_expansion(t)) {
        return None;
    }

    let mut words: Vec<String> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && needs_expansion(token) {
            let expanded = expand_token(token, home);
            tracing::trace!(pattern = %token, matches = expanded.len(), "glob");
            words.extend(expanded);
        } else {
            words.push(token.clone());
        }
    }

    Some(split_into_tokens(&words.join(" ")))
}
