use std::fs::{File, OpenOptions};
use std::io;

use crate::ast::{RedirMode, RedirTarget, Redirection};
use crate::environment::Environment;
use crate::error::ShellError;
use crate::expander;

/// A stage's redirections resolved to open files. Targets are opened
/// before any fd is duplicated; `&>`/`&>>` share one file between stdout
/// and stderr so both streams land in it.
pub struct ResolvedRedirs {
    pub stdin: Option<File>,
    pub stdout: Option<File>,
    pub stderr: Option<File>,
}

pub fn open_redirections(
    redirs: &[Redirection],
    env: &Environment,
) -> Result<ResolvedRedirs, ShellError> {
    let mut resolved = ResolvedRedirs {
        stdin: None,
        stdout: None,
        stderr: None,
    };

    for redir in redirs {
        let path = expander::expand_single(&redir.path, env);
        let open = |result: io::Result<File>| {
            result.map_err(|source| ShellError::Redirection {
                path: path.clone(),
                source,
            })
        };
        match redir.target {
            RedirTarget::Stdin => resolved.stdin = Some(open(File::open(&path))?),
            RedirTarget::Stdout => resolved.stdout = Some(open(open_out(&path, redir.mode))?),
            RedirTarget::Stderr => resolved.stderr = Some(open(open_out(&path, redir.mode))?),
            RedirTarget::StdoutStderr => {
                let file = open(open_out(&path, redir.mode))?;
                resolved.stdout = Some(open(file.try_clone())?);
                resolved.stderr = Some(file);
            }
        }
    }
    Ok(resolved)
}

fn open_out(path: &str, mode: RedirMode) -> io::Result<File> {
    match mode {
        RedirMode::Truncate => File::create(path),
        RedirMode::Append => OpenOptions::new().create(true).append(true).open(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Word;
    use std::io::{Read, Write};

    #[test]
    fn truncate_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let env = Environment::empty();
        let redirs = [Redirection {
            target: RedirTarget::Stdout,
            mode: RedirMode::Truncate,
            path: Word::bare(path.to_str().unwrap()),
        }];
        let resolved = open_redirections(&redirs, &env).unwrap();
        assert!(resolved.stdout.is_some());
        assert!(path.exists());
    }

    #[test]
    fn append_preserves_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "first\n").unwrap();
        let env = Environment::empty();
        let redirs = [Redirection {
            target: RedirTarget::Stdout,
            mode: RedirMode::Append,
            path: Word::bare(path.to_str().unwrap()),
        }];
        let resolved = open_redirections(&redirs, &env).unwrap();
        writeln!(resolved.stdout.unwrap(), "second").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn combined_redirection_shares_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("both.txt");
        let env = Environment::empty();
        let redirs = [Redirection {
            target: RedirTarget::StdoutStderr,
            mode: RedirMode::Truncate,
            path: Word::bare(path.to_str().unwrap()),
        }];
        let resolved = open_redirections(&redirs, &env).unwrap();
        let mut out = resolved.stdout.unwrap();
        let mut err = resolved.stderr.unwrap();
        out.write_all(b"to stdout\n").unwrap();
        err.write_all(b"to stderr\n").unwrap();
        let mut content = String::new();
        File::open(&path).unwrap().read_to_string(&mut content).unwrap();
        // the two handles share one offset, so neither write clobbers the
        // other
        assert_eq!(content, "to stdout\nto stderr\n");
    }

    #[test]
    fn missing_stdin_target_is_an_error() {
        let env = Environment::empty();
        let redirs = [Redirection {
            target: RedirTarget::Stdin,
            mode: RedirMode::Truncate,
            path: Word::bare("/no/such/file/at/all"),
        }];
        assert!(open_redirections(&redirs, &env).is_err());
    }
}
