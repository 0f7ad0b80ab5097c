use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub prompt: String,
    pub history_file: String,
    pub history_max: usize,
    pub z_database_file: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> Config {
        Config {
            prompt: "ncsh> ".to_string(),
            history_file: "~/.ncsh_history".to_string(),
            history_max: 500,
            z_database_file: "~/.ncsh_z_database".to_string(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let mut src = String::new();
        for line in BufReader::new(file).lines() {
            src.push_str(&line?);
            src.push('\n');
        }
        Self::load_from_str(&src)
    }

    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        let mut config = Self::default_config();

        for (lineno, line) in src.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse(format!(
                    "Line {}: No '=' found: {}",
                    lineno + 1,
                    line
                )));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "prompt" => config.prompt = value.to_string(),
                "history_file" => config.history_file = value.to_string(),
                "history_max" => match value.parse::<usize>() {
                    Ok(n) => config.history_max = n,
                    Err(_) => {
                        return Err(ConfigError::Parse(format!(
                            "Line {}: Invalid usize: {}",
                            lineno + 1,
                            line
                        )));
                    }
                },
                "z_database_file" => config.z_database_file = value.to_string(),
                _ => {
                    return Err(ConfigError::Parse(format!(
                        "Line {}: Unknown key: {}",
                        lineno + 1,
                        key
                    )));
                }
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ConfigLoader::default_config();
        assert_eq!(config.prompt, "ncsh> ");
        assert_eq!(config.history_max, 500);
    }

    #[test]
    fn parses_overrides() {
        let config = ConfigLoader::load_from_str(
            "# comment\nprompt=% \nhistory_max=100\nz_database_file=/tmp/zdb\n",
        )
        .unwrap();
        assert_eq!(config.prompt, "% ");
        assert_eq!(config.history_max, 100);
        assert_eq!(config.z_database_file, "/tmp/zdb");
        // untouched keys keep their defaults
        assert_eq!(config.history_file, "~/.ncsh_history");
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(ConfigLoader::load_from_str("nope=1\n").is_err());
        assert!(ConfigLoader::load_from_str("history_max=abc\n").is_err());
    }
}
