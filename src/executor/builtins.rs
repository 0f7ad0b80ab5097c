use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::session::Session;

/// A command run inside the shell process. Output goes through `out` so a
/// sole builtin honors stdout redirection without forking; diagnostics go
/// to the shell's own stderr.
pub trait BuiltinCommand {
    /// All names this command answers to.
    fn names(&self) -> &'static [&'static str];
    fn run(&self, args: &[String], session: &mut Session, out: &mut dyn Write) -> i32;
}

pub struct BuiltinManager {
    commands: Vec<Box<dyn BuiltinCommand>>,
    by_name: HashMap<&'static str, usize>,
}

impl BuiltinManager {
    pub fn new() -> Self {
        let mut mgr = BuiltinManager {
            commands: Vec::new(),
            by_name: HashMap::new(),
        };
        mgr.register(Box::new(CdCommand));
        mgr.register(Box::new(ZCommand));
        mgr.register(Box::new(EchoCommand));
        mgr.register(Box::new(PwdCommand));
        mgr.register(Box::new(KillCommand));
        mgr.register(Box::new(ExitCommand));
        mgr.register(Box::new(HelpCommand));
        mgr.register(Box::new(HistoryCommand));
        mgr
    }

    pub fn register(&mut self, cmd: Box<dyn BuiltinCommand>) {
        let index = self.commands.len();
        for name in cmd.names() {
            self.by_name.insert(name, index);
        }
        self.commands.push(cmd);
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Dispatches `argv[0]`; the remaining words are the arguments.
    pub fn run(&self, argv: &[String], session: &mut Session, out: &mut dyn Write) -> i32 {
        let Some(name) = argv.first() else {
            return 0;
        };
        match self.by_name.get(name.as_str()) {
            Some(&index) => self.commands[index].run(&argv[1..], session, out),
            None => 1,
        }
    }
}

impl Default for BuiltinManager {
    fn default() -> Self {
        Self::new()
    }
}

fn change_directory(target: &str, session: &mut Session) -> i32 {
    match std::env::set_current_dir(target) {
        Ok(()) => {
            if let Ok(cwd) = std::env::current_dir() {
                session.z.visit(&cwd.to_string_lossy());
            }
            0
        }
        Err(e) => {
            eprintln!("cd: {}: {}", target, e);
            1
        }
    }
}

fn change_to_home(session: &mut Session) -> i32 {
    let Some(home) = session.env.home().map(str::to_string) else {
        eprintln!("ncsh cd: could not change directory.");
        return 1;
    };
    change_directory(&home, session)
}

pub struct CdCommand;

impl BuiltinCommand for CdCommand {
    fn names(&self) -> &'static [&'static str] {
        &["cd"]
    }
    fn run(&self, args: &[String], session: &mut Session, _out: &mut dyn Write) -> i32 {
        match args.first() {
            Some(target) => change_directory(target, session),
            None => change_to_home(session),
        }
    }
}

pub struct ZCommand;

impl BuiltinCommand for ZCommand {
    fn names(&self) -> &'static [&'static str] {
        &["z"]
    }
    fn run(&self, args: &[String], session: &mut Session, out: &mut dyn Write) -> i32 {
        match args {
            [] => change_to_home(session),
            [sub] if sub == "print" => {
                for entry in session.z.entries() {
                    let _ = writeln!(
                        out,
                        "{} | rank: {} | last accessed: {}",
                        entry.path, entry.rank, entry.last_accessed
                    );
                }
                0
            }
            [sub, path] if sub == "add" => {
                if session.z.add(path) {
                    let _ = writeln!(out, "z: Added new entry to z database.");
                    0
                } else {
                    let _ = writeln!(out, "z: Entry already exists in z database.");
                    1
                }
            }
            [sub, path] if sub == "rm" || sub == "remove" => {
                if session.z.remove(path) {
                    let _ = writeln!(out, "z: Removed entry from z database.");
                    0
                } else {
                    let _ = writeln!(out, "z: Entry does not exist in z database.");
                    1
                }
            }
            [target] => {
                // an existing directory wins over the database
                if Path::new(target).is_dir() {
                    return change_directory(target, session);
                }
                match session.z.best_match(target) {
                    Some(path) => change_directory(&path, session),
                    None => {
                        eprintln!("z: could not find match for {}", target);
                        1
                    }
                }
            }
            _ => {
                let _ = writeln!(out, "ncsh z: command not found, options not supported.");
                1
            }
        }
    }
}

pub struct EchoCommand;

impl BuiltinCommand for EchoCommand {
    fn names(&self) -> &'static [&'static str] {
        &["echo"]
    }
    fn run(&self, args: &[String], _session: &mut Session, out: &mut dyn Write) -> i32 {
        let (newline, words) = match args.first() {
            Some(flag) if flag == "-n" => (false, &args[1..]),
            _ => (true, args),
        };
        let _ = write!(out, "{}", words.join(" "));
        if newline {
            let _ = writeln!(out);
        }
        0
    }
}

pub struct PwdCommand;

impl BuiltinCommand for PwdCommand {
    fn names(&self) -> &'static [&'static str] {
        &["pwd"]
    }
    fn run(&self, _args: &[String], _session: &mut Session, out: &mut dyn Write) -> i32 {
        match std::env::current_dir() {
            Ok(path) => {
                let _ = writeln!(out, "{}", path.display());
                0
            }
            Err(e) => {
                eprintln!("ncsh pwd: Error when getting current directory: {}", e);
                1
            }
        }
    }
}

pub struct KillCommand;

impl BuiltinCommand for KillCommand {
    fn names(&self) -> &'static [&'static str] {
        &["kill"]
    }
    fn run(&self, args: &[String], _session: &mut Session, out: &mut dyn Write) -> i32 {
        let Some(arg) = args.first() else {
            let _ = writeln!(out, "ncsh kill: nothing to kill, please pass in a process ID (PID).");
            return 1;
        };
        let Ok(pid) = arg.parse::<i32>() else {
            let _ = writeln!(out, "ncsh kill: could not parse process ID (PID) from arguments.");
            return 1;
        };
        if kill(Pid::from_raw(pid), Signal::SIGTERM).is_err() {
            let _ = writeln!(
                out,
                "ncsh kill: could not kill process with process ID (PID): {}",
                pid
            );
            return 1;
        }
        0
    }
}

pub struct ExitCommand;

impl BuiltinCommand for ExitCommand {
    fn names(&self) -> &'static [&'static str] {
        &["exit", "quit", "q"]
    }
    fn run(&self, _args: &[String], session: &mut Session, _out: &mut dyn Write) -> i32 {
        session.exit_requested = true;
        0
    }
}

pub struct HelpCommand;

impl BuiltinCommand for HelpCommand {
    fn names(&self) -> &'static [&'static str] {
        &["help"]
    }
    fn run(&self, _args: &[String], _session: &mut Session, out: &mut dyn Write) -> i32 {
        let _ = writeln!(out, "ncsh help\n");
        let _ = writeln!(out, "Builtin Commands: {{command}} {{args}}\n");
        let _ = writeln!(out, "q:                        To exit, type q, exit, or quit and press enter. You can also use Ctrl+D to exit.\n");
        let _ = writeln!(out, "cd/z:                     You can change directory with cd or z.\n");
        let _ = writeln!(out, "z {{directory}}:            A builtin autojump. Navigate to a directory using frequency and recency.\n");
        let _ = writeln!(out, "z add {{directory}}:        Manually add a directory to your z database.\n");
        let _ = writeln!(out, "z rm {{directory}}:         Manually remove a directory from your z database. Can also call using z remove.\n");
        let _ = writeln!(out, "z print:                  Print out information about the entries in your z database.\n");
        let _ = writeln!(out, "echo:                     You can write things to the screen using echo.\n");
        let _ = writeln!(out, "history:                  You can see your command history using the history command.\n");
        let _ = writeln!(out, "history count:            You can see the number of entries in your history with history count command.\n");
        let _ = writeln!(out, "pwd:                      Prints the current working directory.\n");
        let _ = writeln!(out, "kill {{processId}}:         Terminates the process with associated processId.");
        0
    }
}

pub struct HistoryCommand;

impl BuiltinCommand for HistoryCommand {
    fn names(&self) -> &'static [&'static str] {
        &["history"]
    }
    fn run(&self, args: &[String], session: &mut Session, out: &mut dyn Write) -> i32 {
        match args.first() {
            None => {
                for (i, entry) in session.history.list().iter().enumerate() {
                    let _ = writeln!(out, "{} {}", i + 1, entry);
                }
                0
            }
            Some(sub) if sub == "count" => {
                let _ = writeln!(out, "history count: {}", session.history.count());
                0
            }
            Some(_) => {
                let _ = writeln!(out, "ncsh history: command not found.");
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(argv: &[&str], session: &mut Session) -> (i32, String) {
        let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        let status = BuiltinManager::new().run(&argv, session, &mut out);
        (status, String::from_utf8(out).unwrap())
    }

    #[test]
    fn recognizes_builtin_names() {
        let mgr = BuiltinManager::new();
        for name in ["cd", "z", "echo", "pwd", "kill", "exit", "quit", "q", "help", "history"] {
            assert!(mgr.is_builtin(name), "{} should be a builtin", name);
        }
        assert!(!mgr.is_builtin("ls"));
    }

    #[test]
    fn echo_joins_words() {
        let mut session = Session::ephemeral();
        let (status, out) = run(&["echo", "hello", "world"], &mut session);
        assert_eq!(status, 0);
        assert_eq!(out, "hello world\n");
    }

    #[test]
    fn echo_n_suppresses_newline() {
        let mut session = Session::ephemeral();
        let (_, out) = run(&["echo", "-n", "hi"], &mut session);
        assert_eq!(out, "hi");
    }

    #[test]
    fn exit_aliases_request_exit() {
        for name in ["exit", "quit", "q"] {
            let mut session = Session::ephemeral();
            let (status, _) = run(&[name], &mut session);
            assert_eq!(status, 0);
            assert!(session.exit_requested);
        }
    }

    #[test]
    fn kill_without_pid_complains() {
        let mut session = Session::ephemeral();
        let (status, out) = run(&["kill"], &mut session);
        assert_eq!(status, 1);
        assert_eq!(
            out,
            "ncsh kill: nothing to kill, please pass in a process ID (PID).\n"
        );
    }

    #[test]
    fn kill_rejects_non_numeric_pid() {
        let mut session = Session::ephemeral();
        let (status, out) = run(&["kill", "abc"], &mut session);
        assert_eq!(status, 1);
        assert_eq!(
            out,
            "ncsh kill: could not parse process ID (PID) from arguments.\n"
        );
    }

    #[test]
    fn z_add_reports_duplicates() {
        let mut session = Session::ephemeral();
        let (status, out) = run(&["z", "add", "/tmp/project"], &mut session);
        assert_eq!(status, 0);
        assert_eq!(out, "z: Added new entry to z database.\n");

        let (status, out) = run(&["z", "add", "/tmp/project"], &mut session);
        assert_eq!(status, 1);
        assert_eq!(out, "z: Entry already exists in z database.\n");
    }

    #[test]
    fn z_remove_reports_missing_entries() {
        let mut session = Session::ephemeral();
        session.z.add("/tmp/project");
        let (status, out) = run(&["z", "rm", "/tmp/project"], &mut session);
        assert_eq!(status, 0);
        assert_eq!(out, "z: Removed entry from z database.\n");

        let (status, out) = run(&["z", "remove", "/tmp/project"], &mut session);
        assert_eq!(status, 1);
        assert_eq!(out, "z: Entry does not exist in z database.\n");
    }

    #[test]
    fn cd_to_missing_directory_fails() {
        let mut session = Session::ephemeral();
        let (status, _) = run(&["cd", "/no/such/directory/at/all"], &mut session);
        assert_eq!(status, 1);
    }

    #[test]
    fn history_lists_numbered_entries() {
        let mut session = Session::ephemeral();
        session.history.add("ls");
        session.history.add("echo hi");
        let (status, out) = run(&["history"], &mut session);
        assert_eq!(status, 0);
        assert_eq!(out, "1 ls\n2 echo hi\n");

        let (_, out) = run(&["history", "count"], &mut session);
        assert_eq!(out, "history count: 2\n");
    }
}
