use std::path::{Path, PathBuf};

use crate::environment::Environment;

/// Resolves a command name to an executable path: names containing `/` are
/// taken as-is, everything else is searched on `$PATH`.
pub struct PathResolver;

impl PathResolver {
    pub fn resolve(name: &str, env: &Environment) -> Option<PathBuf> {
        if name.contains('/') {
            let path = Path::new(name);
            if path.is_file() {
                return Some(path.to_path_buf());
            }
            return None;
        }

        let paths = env.get("PATH")?;
        for dir in std::env::split_paths(paths) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_from_path() {
        let mut env = Environment::empty();
        env.set("PATH", "/usr/bin:/bin");
        let resolved = PathResolver::resolve("sh", &env);
        assert!(resolved.is_some());
    }

    #[test]
    fn missing_command_is_none() {
        let mut env = Environment::empty();
        env.set("PATH", "/usr/bin:/bin");
        assert!(PathResolver::resolve("definitely-not-a-command-xyz", &env).is_none());
    }

    #[test]
    fn slash_paths_bypass_path_lookup() {
        let env = Environment::empty();
        assert!(PathResolver::resolve("/bin/sh", &env).is_some());
        assert!(PathResolver::resolve("./no/such/file", &env).is_none());
    }
}
