use std::collections::HashMap;

/// Session-scoped variable store read by the expander and written by
/// assignment statements. Seeded from the OS environment at startup so
/// `$HOME`, `$PATH` and friends expand; last assignment wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        let mut env = Environment {
            vars: HashMap::new(),
        };
        for (k, v) in std::env::vars() {
            env.vars.insert(k, v);
        }
        env
    }

    pub fn empty() -> Self {
        Environment {
            vars: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    pub fn home(&self) -> Option<&str> {
        self.get("HOME")
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_includes_os_env() {
        let env = Environment::new();
        assert!(!env.vars.is_empty());
    }

    #[test]
    fn set_and_get() {
        let mut env = Environment::empty();
        env.set("FOO", "bar");
        assert_eq!(env.get("FOO"), Some("bar"));
        assert_eq!(env.get("MISSING"), None);
    }

    #[test]
    fn last_assignment_wins() {
        let mut env = Environment::empty();
        env.set("FOO", "one");
        env.set("FOO", "two");
        assert_eq!(env.get("FOO"), Some("two"));
    }
}
