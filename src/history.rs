use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// File-backed command history. One entry per line; consecutive duplicates
/// are not recorded; the oldest entries are dropped past `max_len`.
pub struct History {
    entries: Vec<String>,
    max_len: usize,
    file_path: Option<PathBuf>,
}

impl History {
    pub fn in_memory(max_len: usize) -> Self {
        History {
            entries: Vec::new(),
            max_len,
            file_path: None,
        }
    }

    /// Loads history from `path`; a missing file is an empty history.
    pub fn load(path: &Path, max_len: usize) -> Self {
        let mut entries = Vec::new();
        if let Ok(file) = File::open(path) {
            for line in BufReader::new(file).lines().map_while(Result::ok) {
                if !line.trim().is_empty() {
                    entries.push(line);
                }
            }
        }
        if entries.len() > max_len {
            entries.drain(..entries.len() - max_len);
        }
        History {
            entries,
            max_len,
            file_path: Some(path.to_path_buf()),
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        for line in &self.entries {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    pub fn add(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.entries.last().is_some_and(|last| last == trimmed) {
            return;
        }
        self.entries.push(trimmed.to_string());
        if self.entries.len() > self.max_len {
            self.entries.remove(0);
        }
    }

    pub fn list(&self) -> &[String] {
        &self.entries
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_list() {
        let mut history = History::in_memory(10);
        history.add("ls");
        history.add("echo hi");
        assert_eq!(history.list(), &["ls".to_string(), "echo hi".to_string()]);
        assert_eq!(history.count(), 2);
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let mut history = History::in_memory(10);
        history.add("ls");
        history.add("ls");
        assert_eq!(history.count(), 1);
    }

    #[test]
    fn blank_lines_ignored() {
        let mut history = History::in_memory(10);
        history.add("   ");
        assert_eq!(history.count(), 0);
    }

    #[test]
    fn max_len_trims_oldest() {
        let mut history = History::in_memory(2);
        history.add("one");
        history.add("two");
        history.add("three");
        assert_eq!(history.list(), &["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let mut history = History::load(&path, 10);
        history.add("ls | wc -c");
        history.add("echo hello");
        history.save().unwrap();

        let reloaded = History::load(&path, 10);
        assert_eq!(reloaded.list(), history.list());
    }
}
