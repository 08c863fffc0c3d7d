//! Command history for sigmash
//!
//! Every entered line is stored with its time in a plain text file, one
//! `timestamp;line` record per line, newest last.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to read history {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to save history {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A single history entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The entered line
    pub line: String,
    /// Unix timestamp
    #[allow(dead_code)]
    pub timestamp: u64,
}

/// Command history storage
pub struct CommandHistory {
    /// All history entries (newest last)
    entries: Vec<HistoryEntry>,
    /// File path for persistence
    file_path: PathBuf,
    /// Maximum entries
    max_entries: usize,
}

impl CommandHistory {
    /// Open the history file, creating its directory if needed
    pub fn open(path: &Path, max_entries: usize) -> Result<Self, HistoryError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| HistoryError::Save {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let mut history = Self {
            entries: Vec::new(),
            file_path: path.to_path_buf(),
            max_entries,
        };
        history.load()?;
        Ok(history)
    }

    /// Load history from file
    fn load(&mut self) -> Result<(), HistoryError> {
        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(HistoryError::Load {
                    path: self.file_path.clone(),
                    source,
                })
            }
        };

        for record in content.lines() {
            match record.split_once(';') {
                Some((ts, line)) => match ts.parse::<u64>() {
                    Ok(timestamp) => self.entries.push(HistoryEntry {
                        line: line.to_string(),
                        timestamp,
                    }),
                    Err(_) => warn!("Skipping history record with bad timestamp: {:?}", record),
                },
                None => warn!("Skipping malformed history record: {:?}", record),
            }
        }
        self.trim();
        debug!("Loaded {} history entries", self.entries.len());
        Ok(())
    }

    /// Save history to file
    fn save(&self) -> Result<(), HistoryError> {
        let mut content = String::new();
        for entry in &self.entries {
            content.push_str(&format!("{};{}\n", entry.timestamp, entry.line));
        }
        fs::write(&self.file_path, content).map_err(|source| HistoryError::Save {
            path: self.file_path.clone(),
            source,
        })
    }

    /// Record a line. Blank lines are skipped.
    pub fn add(&mut self, line: &str) -> Result<(), HistoryError> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.entries.push(HistoryEntry {
            line: line.to_string(),
            timestamp,
        });
        self.trim();
        self.save()
    }

    /// Drop the oldest entries beyond the limit
    fn trim(&mut self) {
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
    }

    /// Most recent entries, oldest first
    pub fn recent(&self, count: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(count);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(entries: &[HistoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.line.as_str()).collect()
    }

    #[test]
    fn test_add_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history");

        let mut history = CommandHistory::open(&path, 100).unwrap();
        assert!(history.is_empty());
        history.add("ls -l").unwrap();
        history.add("echo a;b").unwrap();

        let reopened = CommandHistory::open(&path, 100).unwrap();
        assert_eq!(lines(reopened.recent(10)), vec!["ls -l", "echo a;b"]);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = CommandHistory::open(&dir.path().join("history"), 100).unwrap();

        history.add("").unwrap();
        history.add("   ").unwrap();
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let mut history = CommandHistory::open(&path, 2).unwrap();

        for line in ["one", "two", "three"] {
            history.add(line).unwrap();
        }
        assert_eq!(lines(history.recent(10)), vec!["two", "three"]);

        let saved = fs::read_to_string(&path).unwrap();
        assert_eq!(saved.lines().count(), 2);
    }

    #[test]
    fn test_recent_takes_newest() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = CommandHistory::open(&dir.path().join("history"), 100).unwrap();
        for line in ["a", "b", "c"] {
            history.add(line).unwrap();
        }
        assert_eq!(lines(history.recent(2)), vec!["b", "c"]);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        fs::write(&path, "17;good\nnot a record\nxx;bad ts\n18;also good\n").unwrap();

        let history = CommandHistory::open(&path, 100).unwrap();
        assert_eq!(lines(history.recent(10)), vec!["good", "also good"]);
        assert_eq!(history.recent(1)[0].timestamp, 18);
    }
}
