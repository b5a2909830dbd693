//! Persistent, append-only command history.
//!
//! The log is a flat text file with one command per line, oldest first. The
//! line number of a command (counting from 0) is its sequence number, so a
//! number handed out once keeps naming the same command for as long as the
//! file exists.

use crate::error::{Result, ShellError};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

/// Number of entries `history` prints when given no argument.
pub const DEFAULT_HISTORY_SHOWN: usize = 10;

/// Diagnostic prefix for failures touching the log file.
const HISTORY_CONTEXT: &str = "msh_history";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub seq: usize,
    pub line: String,
}

/// Which recorded command a bang reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRef {
    Last,
    Seq(usize),
}

/// In-memory copy of the log plus the file it is mirrored to.
#[derive(Debug)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    path: Option<PathBuf>,
}

impl HistoryStore {
    /// Load the log at `path`. A missing file is an empty log; it is created on
    /// the first [`record`](Self::record).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => text
                .lines()
                .enumerate()
                .map(|(seq, line)| HistoryEntry {
                    seq,
                    line: line.to_string(),
                })
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ShellError::os(HISTORY_CONTEXT, e)),
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded history");
        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    /// A log that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            entries: Vec::new(),
            path: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append `line` with the next sequence number. Blank lines are skipped.
    ///
    /// The entry is kept in memory even if writing it to the file fails; the
    /// write error is returned so the caller can report it.
    pub fn record(&mut self, line: &str) -> Result<()> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(());
        }

        let seq = self.entries.len();
        self.entries.push(HistoryEntry {
            seq,
            line: line.to_string(),
        });
        tracing::trace!(seq, line, "recorded history entry");

        let Some(path) = &self.path else {
            return Ok(());
        };
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{line}"))
            .map_err(|e| {
                tracing::warn!("failed to append to {}: {}", path.display(), e);
                ShellError::os(HISTORY_CONTEXT, e)
            })
    }

    /// Text of the entry `reference` points at.
    pub fn recall(&self, reference: HistoryRef) -> Result<&str> {
        let entry = match reference {
            HistoryRef::Last => self.entries.last(),
            HistoryRef::Seq(seq) => self.entries.get(seq),
        };
        entry
            .map(|e| e.line.as_str())
            .ok_or(ShellError::HistoryRange)
    }

    /// The last `n` entries, oldest first.
    pub fn list(&self, n: usize) -> &[HistoryEntry] {
        Self::tail(&self.entries, n)
    }

    /// The last `n` entries before the newest one, oldest first.
    ///
    /// `history` is itself recorded before it runs, so this is what it shows.
    pub fn list_prior(&self, n: usize) -> &[HistoryEntry] {
        let prior = match self.entries.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        };
        Self::tail(prior, n)
    }

    fn tail(entries: &[HistoryEntry], n: usize) -> &[HistoryEntry] {
        &entries[entries.len().saturating_sub(n)..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(lines: &[&str]) -> HistoryStore {
        let mut store = HistoryStore::in_memory();
        for line in lines {
            store.record(line).unwrap();
        }
        store
    }

    #[test]
    fn test_record_then_recall_last() {
        let store = store_with(&["ls -l"]);
        assert_eq!(store.recall(HistoryRef::Last).unwrap(), "ls -l");
    }

    #[test]
    fn test_recall_out_of_range() {
        let store = store_with(&["a", "b"]);
        assert!(matches!(
            store.recall(HistoryRef::Seq(999)),
            Err(ShellError::HistoryRange)
        ));
        assert!(matches!(
            HistoryStore::in_memory().recall(HistoryRef::Last),
            Err(ShellError::HistoryRange)
        ));
        assert_eq!(store.recall(HistoryRef::Seq(0)).unwrap(), "a");
        assert_eq!(store.recall(HistoryRef::Seq(1)).unwrap(), "b");
    }

    #[test]
    fn test_blank_lines_not_recorded() {
        let store = store_with(&["", "  \t", "\n", "pwd"]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list(10)[0], HistoryEntry { seq: 0, line: "pwd".into() });
    }

    #[test]
    fn test_list_windows() {
        let store = store_with(&["a", "b", "c", "d"]);
        let seqs: Vec<usize> = store.list(2).iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
        assert_eq!(store.list(100).len(), 4);

        let prior: Vec<&str> = store.list_prior(2).iter().map(|e| e.line.as_str()).collect();
        assert_eq!(prior, vec!["b", "c"]);
        assert!(HistoryStore::in_memory().list_prior(5).is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".msh_history");

        let mut store = HistoryStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.record("echo one").unwrap();
        store.record("echo two\n").unwrap();
        drop(store);

        assert_eq!(fs::read_to_string(&path).unwrap(), "echo one\necho two\n");

        let mut reopened = HistoryStore::open(&path).unwrap();
        assert_eq!(reopened.recall(HistoryRef::Seq(1)).unwrap(), "echo two");
        reopened.record("echo three").unwrap();
        assert_eq!(
            reopened.list(1),
            &[HistoryEntry { seq: 2, line: "echo three".into() }]
        );
    }

    #[test]
    fn test_unwritable_log_reports_but_keeps_entry() {
        let dir = tempfile::tempdir().unwrap();
        // parent directory does not exist
        let mut store = HistoryStore::open(dir.path().join("missing").join("log")).unwrap();
        let err = store.record("true").unwrap_err();
        assert!(err.to_string().starts_with("msh_history: "));
        assert_eq!(store.recall(HistoryRef::Last).unwrap(), "true");
    }
}
