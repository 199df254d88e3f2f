//! Trade log reader.
//!
//! The trade log is append-only JSONL written by the bot. A crashed writer can leave a
//! partial last line, so every line is parsed on its own and anything unusable is
//! skipped rather than failing the run.

use crate::error::ReconcileError;
use crate::model::LogEntry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use tracing::debug;

/// Why a log line contributed nothing to the index. Both are recovered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogIssue {
    /// Not UTF-8, not JSON, or not a JSON object.
    MalformedLine,
    /// Valid record without a usable client order id.
    MissingJoinKey,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogReadStats {
    /// Non-blank lines seen.
    pub lines: usize,
    pub malformed: usize,
    pub missing_key: usize,
    /// Lines that replaced an earlier entry with the same key.
    pub overwritten: usize,
}

impl LogReadStats {
    fn record(&mut self, issue: LogIssue) {
        match issue {
            LogIssue::MalformedLine => self.malformed += 1,
            LogIssue::MissingJoinKey => self.missing_key += 1,
        }
    }
}

/// Trade log entries keyed by client order id.
#[derive(Debug, Default, Clone)]
pub struct LogIndex {
    entries: HashMap<String, LogEntry>,
    stats: LogReadStats,
}

impl LogIndex {
    /// Later inserts for the same key replace earlier ones.
    pub fn insert(&mut self, key: String, entry: LogEntry) {
        if self.entries.insert(key, entry).is_some() {
            self.stats.overwritten += 1;
        }
    }

    pub fn get(&self, client_order_id: &str) -> Option<&LogEntry> {
        self.entries.get(client_order_id)
    }

    pub fn contains_key(&self, client_order_id: &str) -> bool {
        self.entries.contains_key(client_order_id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> LogReadStats {
        self.stats
    }
}

/// Read the trade log at `path`. A missing file yields an empty index.
pub fn read_log(path: &Path) -> Result<LogIndex, ReconcileError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Trade log not found, using empty index");
            return Ok(LogIndex::default());
        }
        Err(e) => return Err(e.into()),
    };

    let index = parse_log(BufReader::new(file))?;
    let stats = index.stats();
    debug!(
        path = %path.display(),
        entries = index.len(),
        lines = stats.lines,
        malformed = stats.malformed,
        missing_key = stats.missing_key,
        overwritten = stats.overwritten,
        "Trade log indexed"
    );
    Ok(index)
}

/// Build an index from JSONL content.
pub fn parse_log<R: BufRead>(reader: R) -> Result<LogIndex, ReconcileError> {
    let mut index = LogIndex::default();

    // Split on raw bytes so a line with broken UTF-8 is skipped instead of ending the read.
    for (line_no, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        index.stats.lines += 1;

        match parse_line(&line) {
            Ok((key, entry)) => index.insert(key, entry),
            Err(issue) => {
                debug!(line = line_no + 1, ?issue, "Skipping trade log line");
                index.stats.record(issue);
            }
        }
    }

    Ok(index)
}

fn parse_line(line: &[u8]) -> Result<(String, LogEntry), LogIssue> {
    let entry: LogEntry = serde_json::from_slice(line).map_err(|_| LogIssue::MalformedLine)?;
    let key = entry
        .join_key()
        .ok_or(LogIssue::MissingJoinKey)?
        .to_string();
    Ok((key, entry))
}
