//! Command history stores.
//!
//! Two implementations share [`HistoryStore`]: [`MemoryHistory`] keeps a
//! bounded ring for the life of the process, [`FileHistory`] additionally
//! mirrors every accepted line to a text file (one entry per line, newest
//! last) and reloads it on startup.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// History failures.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("cannot load history from {}: {source}", .path.display())]
    Load { path: PathBuf, source: io::Error },

    #[error("cannot persist history to {}: {source}", .path.display())]
    Persist { path: PathBuf, source: io::Error },
}

/// Ordered record of accepted lines, oldest first.
pub trait HistoryStore {
    /// Record a line. Returns `Ok(false)` when the line was skipped (blank,
    /// or identical to the newest entry).
    ///
    /// A persistence failure is returned as an error *after* the entry has
    /// been recorded in memory.
    fn append(&mut self, line: &str) -> Result<bool, HistoryError>;

    /// Entry at `index` (0 = oldest retained).
    fn get(&self, index: usize) -> Result<&str, HistoryError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All retained entries, oldest first.
    fn entries(&self) -> Vec<String> {
        (0..self.len())
            .filter_map(|i| self.get(i).ok().map(str::to_string))
            .collect()
    }
}

/// In-memory history bounded to `max_depth` entries.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: VecDeque<String>,
    max_depth: usize,
}

impl MemoryHistory {
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&mut self, line: &str) -> Result<bool, HistoryError> {
        if line.trim().is_empty() || self.entries.back().is_some_and(|last| last == line) {
            return Ok(false);
        }
        self.entries.push_back(line.to_string());
        while self.entries.len() > self.max_depth {
            self.entries.pop_front();
        }
        Ok(true)
    }

    fn get(&self, index: usize) -> Result<&str, HistoryError> {
        self.entries
            .get(index)
            .map(String::as_str)
            .ok_or(HistoryError::OutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// History mirrored to a text file.
#[derive(Debug)]
pub struct FileHistory {
    memory: MemoryHistory,
    path: PathBuf,
}

impl FileHistory {
    /// Load `path` (a missing file is an empty history) and keep the newest
    /// `max_depth` lines. A longer file is rewritten with only those lines.
    pub fn open(path: impl AsRef<Path>, max_depth: usize) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(HistoryError::Load { path, source }),
        };

        let mut memory = MemoryHistory::new(max_depth);
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let skip = lines.len().saturating_sub(memory.max_depth());
        for line in &lines[skip..] {
            memory.append(line)?;
        }

        let history = Self { memory, path };
        if skip > 0 {
            log::debug!(
                "trimming {} old entries from {}",
                skip,
                history.path.display()
            );
            history.rewrite()?;
        }
        log::debug!(
            "loaded {} history entries from {}",
            history.len(),
            history.path.display()
        );
        Ok(history)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rewrite(&self) -> Result<(), HistoryError> {
        let mut text = String::new();
        for entry in self.memory.entries() {
            text.push_str(&entry);
            text.push('\n');
        }
        std::fs::write(&self.path, text).map_err(|source| HistoryError::Persist {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl HistoryStore for FileHistory {
    fn append(&mut self, line: &str) -> Result<bool, HistoryError> {
        if !self.memory.append(line)? {
            return Ok(false);
        }
        self.persist(line).map_err(|source| HistoryError::Persist {
            path: self.path.clone(),
            source,
        })?;
        Ok(true)
    }

    fn get(&self, index: usize) -> Result<&str, HistoryError> {
        self.memory.get(index)
    }

    fn len(&self) -> usize {
        self.memory.len()
    }
}
