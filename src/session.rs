use std::path::PathBuf;

use crate::config::Config;
use crate::environment::Environment;
use crate::history::History;
use crate::z::ZDatabase;

/// Everything a statement can read or mutate while executing: the variable
/// store plus handles to the history and z-database collaborators. Created
/// once at startup and passed by reference through the
/// lex/parse/expand/execute chain.
pub struct Session {
    pub env: Environment,
    pub history: History,
    pub z: ZDatabase,
    pub last_status: i32,
    pub exit_requested: bool,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        let env = Environment::new();
        let history_path = resolve_path(&config.history_file, &env);
        let z_path = resolve_path(&config.z_database_file, &env);
        Session {
            history: History::load(&history_path, config.history_max),
            z: ZDatabase::load(&z_path),
            env,
            last_status: 0,
            exit_requested: false,
        }
    }

    /// A session with no file-backed collaborators, for tests and
    /// single-shot runs that should not touch persisted state.
    pub fn ephemeral() -> Self {
        Session {
            env: Environment::new(),
            history: History::in_memory(500),
            z: ZDatabase::in_memory(),
            last_status: 0,
            exit_requested: false,
        }
    }

    /// Persists the history and z database, reporting failures without
    /// aborting shutdown.
    pub fn persist(&self) {
        if let Err(e) = self.history.save() {
            eprintln!("ncsh: Could not save history file: {}", e);
        }
        if let Err(e) = self.z.save() {
            eprintln!("ncsh: Error writing to z database file: {}", e);
        }
    }
}

fn resolve_path(configured: &str, env: &Environment) -> PathBuf {
    if let Some(rest) = configured.strip_prefix("~/") {
        if let Some(home) = env.home() {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(configured)
}
