use std::path::{Path, PathBuf};

use crate::ast::Word;
use crate::environment::Environment;
use crate::lexer::token::Quoting;

/// Expands a command's words into its final argument vector. Glob
/// expansion can multiply one word into many arguments; an unquoted
/// variable that expands to nothing vanishes.
pub fn expand_words(words: &[Word], env: &Environment) -> Vec<String> {
    words.iter().flat_map(|w| expand_word(w, env)).collect()
}

pub fn expand_word(word: &Word, env: &Environment) -> Vec<String> {
    match word.quote {
        Quoting::Single | Quoting::Backtick => vec![word.text.clone()],
        Quoting::Double => vec![substitute(&word.text, env)],
        Quoting::Unquoted => {
            let substituted = substitute(&tilde(&word.text, env), env);
            let mut args = Vec::new();
            // a variable holding several shell words splits into several
            // arguments
            for field in substituted.split_whitespace() {
                if has_glob(field) {
                    let matches = glob(field);
                    if matches.is_empty() {
                        args.push(field.to_string());
                    } else {
                        args.extend(matches);
                    }
                } else {
                    args.push(field.to_string());
                }
            }
            args
        }
    }
}

/// Expansion for positions that always take exactly one value: redirection
/// targets, assignment values and condition operands. No splitting, no
/// globbing.
pub fn expand_single(word: &Word, env: &Environment) -> String {
    match word.quote {
        Quoting::Single | Quoting::Backtick => word.text.clone(),
        Quoting::Double => substitute(&word.text, env),
        Quoting::Unquoted => substitute(&tilde(&word.text, env), env),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// $NAME becomes the store's current value, or empty string if unset.
fn substitute(text: &str, env: &Environment) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && i + 1 < chars.len() && is_name_start(chars[i + 1]) {
            let mut j = i + 1;
            while j < chars.len() && is_name_char(chars[j]) {
                j += 1;
            }
            let name: String = chars[i + 1..j].iter().collect();
            out.push_str(env.get(&name).unwrap_or(""));
            i = j;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn tilde(text: &str, env: &Environment) -> String {
    let Some(home) = env.home() else {
        return text.to_string();
    };
    if text == "~" {
        home.to_string()
    } else if let Some(rest) = text.strip_prefix("~/") {
        format!("{}/{}", home, rest)
    } else {
        text.to_string()
    }
}

fn has_glob(text: &str) -> bool {
    text.contains('*') || text.contains('?')
}

/// Matches `*`/`?` per path segment against the filesystem. Results are
/// sorted lexicographically; hidden entries only match patterns that spell
/// out the leading dot.
pub fn glob(pattern: &str) -> Vec<String> {
    let absolute = pattern.starts_with('/');
    let mut roots: Vec<PathBuf> = vec![if absolute {
        PathBuf::from("/")
    } else {
        PathBuf::new()
    }];

    for seg in pattern.split('/').filter(|s| !s.is_empty()) {
        let mut next = Vec::new();
        for root in &roots {
            if has_glob(seg) {
                let read_root = if root.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    root.as_path()
                };
                let Ok(entries) = std::fs::read_dir(read_root) else {
                    continue;
                };
                for entry in entries.flatten() {
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else { continue };
                    if name.starts_with('.') && !seg.starts_with('.') {
                        continue;
                    }
                    if glob_match(seg, name) {
                        next.push(root.join(name));
                    }
                }
            } else {
                let candidate = root.join(seg);
                if candidate.exists() {
                    next.push(candidate);
                }
            }
        }
        roots = next;
    }

    let mut out: Vec<String> = roots
        .iter()
        .filter_map(|p| p.to_str().map(String::from))
        .collect();
    out.sort();
    out
}

// Two-pointer match with star backtracking.
fn glob_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((sp, sn)) = star {
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
