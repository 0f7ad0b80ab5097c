use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// One tracked directory: visit count (rank) plus last access time, scored
/// by frecency when matching jump targets.
#[derive(Debug, Clone, PartialEq)]
pub struct ZEntry {
    pub path: String,
    pub rank: f64,
    pub last_accessed: u64,
}

impl ZEntry {
    fn score(&self, now: u64) -> f64 {
        let age = now.saturating_sub(self.last_accessed);
        if age < HOUR {
            self.rank * 4.0
        } else if age < DAY {
            self.rank * 2.0
        } else if age < WEEK {
            self.rank * 0.5
        } else {
            self.rank * 0.25
        }
    }
}

/// The z directory-jump database. Entries are keyed uniquely by path and
/// persisted as `rank|last_accessed|path` lines.
pub struct ZDatabase {
    entries: Vec<ZEntry>,
    file_path: Option<PathBuf>,
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl ZDatabase {
    pub fn in_memory() -> Self {
        ZDatabase {
            entries: Vec::new(),
            file_path: None,
        }
    }

    /// Loads the database from `path`; a missing file is an empty database.
    pub fn load(path: &Path) -> Self {
        let mut entries = Vec::new();
        if let Ok(file) = File::open(path) {
            for line in BufReader::new(file).lines().map_while(Result::ok) {
                let mut parts = line.splitn(3, '|');
                let (Some(rank), Some(last), Some(entry_path)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    continue;
                };
                let (Ok(rank), Ok(last_accessed)) = (rank.parse(), last.parse()) else {
                    continue;
                };
                if entry_path.is_empty() {
                    continue;
                }
                entries.push(ZEntry {
                    path: entry_path.to_string(),
                    rank,
                    last_accessed,
                });
            }
        }
        ZDatabase {
            entries,
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
        for entry in &self.entries {
            writeln!(file, "{}|{}|{}", entry.rank, entry.last_accessed, entry.path)?;
        }
        Ok(())
    }

    pub fn entries(&self) -> &[ZEntry] {
        &self.entries
    }

    /// Adds a path. Returns false without modifying anything when the key
    /// already exists.
    pub fn add(&mut self, path: &str) -> bool {
        if self.entries.iter().any(|e| e.path == path) {
            return false;
        }
        self.entries.push(ZEntry {
            path: path.to_string(),
            rank: 1.0,
            last_accessed: now(),
        });
        true
    }

    /// Removes a path by key. Returns false when no such entry exists.
    pub fn remove(&mut self, path: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.path != path);
        self.entries.len() != before
    }

    /// Records a visit: bumps the rank of an existing entry or inserts a
    /// fresh one.
    pub fn visit(&mut self, path: &str) {
        let stamp = now();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.path == path) {
            entry.rank += 1.0;
            entry.last_accessed = stamp;
        } else {
            self.entries.push(ZEntry {
                path: path.to_string(),
                rank: 1.0,
                last_accessed: stamp,
            });
        }
    }

    /// Best frecency-scored entry whose path contains `target`. A hit
    /// bumps the winner's rank and access time.
    pub fn best_match(&mut self, target: &str) -> Option<String> {
        let stamp = now();
        let mut best: Option<usize> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if !entry.path.contains(target) {
                continue;
            }
            match best {
                Some(b) if self.entries[b].score(stamp) >= entry.score(stamp) => {}
                _ => best = Some(i),
            }
        }
        let i = best?;
        self.entries[i].rank += 1.0;
        self.entries[i].last_accessed = stamp;
        Some(self.entries[i].path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_reports_duplicates() {
        let mut db = ZDatabase::in_memory();
        assert!(db.add("/home/alex/.config"));
        assert!(!db.add("/home/alex/.config"));
        assert_eq!(db.entries().len(), 1);
    }

    #[test]
    fn remove_reports_missing_entries() {
        let mut db = ZDatabase::in_memory();
        db.add("/tmp/project");
        assert!(db.remove("/tmp/project"));
        assert!(!db.remove("/tmp/project"));
    }

    #[test]
    fn visit_bumps_rank() {
        let mut db = ZDatabase::in_memory();
        db.visit("/tmp/project");
        db.visit("/tmp/project");
        assert_eq!(db.entries()[0].rank, 2.0);
        assert_eq!(db.entries().len(), 1);
    }

    #[test]
    fn best_match_prefers_higher_frecency() {
        let mut db = ZDatabase::in_memory();
        db.add("/home/alex/projects/shell");
        db.add("/home/alex/other/shell-scripts");
        for _ in 0..5 {
            db.visit("/home/alex/projects/shell");
        }
        assert_eq!(
            db.best_match("shell"),
            Some("/home/alex/projects/shell".to_string())
        );
        assert_eq!(db.best_match("nomatch"), None);
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("z_database");
        let mut db = ZDatabase::load(&path);
        db.add("/tmp/a");
        db.add("/tmp/b");
        db.save().unwrap();

        let reloaded = ZDatabase::load(&path);
        assert_eq!(reloaded.entries().len(), 2);
        assert_eq!(reloaded.entries()[0].path, "/tmp/a");
    }
}
