use std::io::{self, Write};
use std::os::fd::OwnedFd;

use crate::ast::{CompareOp, CondTest, Condition, LogicalList, LogicalOp, Pipeline, Statement};
use crate::error::ShellError;
use crate::executor::builtins::BuiltinManager;
use crate::executor::path_resolver::PathResolver;
use crate::executor::redirect::open_redirections;
use crate::executor::spawn::{Launcher, OsLauncher, StageIo, Stream, os_pipe};
use crate::expander;
use crate::session::Session;

/// Tree-walking execution engine. One statement in, one exit status out;
/// runtime failures inside a pipeline are reported on stderr and folded
/// into the status rather than aborting the session.
pub struct Engine<L: Launcher> {
    launcher: L,
    builtins: BuiltinManager,
}

/// A pipeline stage after dispatch: either a process we still have to wait
/// for, or one that already failed before it could start.
enum StageResult<H> {
    Running(H),
    Failed(i32),
}

impl Engine<OsLauncher> {
    pub fn with_os_launcher() -> Self {
        Engine::new(OsLauncher)
    }
}

impl<L: Launcher> Engine<L> {
    pub fn new(launcher: L) -> Self {
        Engine {
            launcher,
            builtins: BuiltinManager::new(),
        }
    }

    pub fn execute(
        &mut self,
        statement: &Statement,
        session: &mut Session,
    ) -> Result<i32, ShellError> {
        match statement {
            Statement::List(list) => self.exec_list(list, session),
            Statement::If {
                branches,
                else_body,
            } => self.exec_if(branches, else_body.as_deref(), session),
            Statement::For { var, source, body } => self.exec_for(var, source, body, session),
            Statement::Assignment { name, value } => {
                let value = expander::expand_single(value, &session.env);
                session.env.set(name, &value);
                Ok(0)
            }
        }
    }

    fn exec_list(&mut self, list: &LogicalList, session: &mut Session) -> Result<i32, ShellError> {
        let mut status = self.exec_pipeline(&list.head, session)?;
        for (op, pipeline) in &list.tail {
            if session.exit_requested {
                break;
            }
            let proceed = match op {
                LogicalOp::And => status == 0,
                LogicalOp::Or => status != 0,
            };
            // the first unsatisfied connective ends the whole list
            if !proceed {
                break;
            }
            status = self.exec_pipeline(pipeline, session)?;
        }
        Ok(status)
    }

    fn exec_if(
        &mut self,
        branches: &[(Condition, Vec<Statement>)],
        else_body: Option<&[Statement]>,
        session: &mut Session,
    ) -> Result<i32, ShellError> {
        for (condition, body) in branches {
            if eval_condition(condition, session) {
                return self.exec_body(body, session);
            }
        }
        match else_body {
            Some(body) => self.exec_body(body, session),
            None => Ok(session.last_status),
        }
    }

    fn exec_for(
        &mut self,
        var: &str,
        source: &[crate::ast::Word],
        body: &[Statement],
        session: &mut Session,
    ) -> Result<i32, ShellError> {
        // the item list is expanded once, before the first iteration
        let items = expander::expand_words(source, &session.env);
        let mut status = 0;
        for item in items {
            session.env.set(var, &item);
            status = self.exec_body(body, session)?;
            if session.exit_requested {
                break;
            }
        }
        Ok(status)
    }

    fn exec_body(&mut self, body: &[Statement], session: &mut Session) -> Result<i32, ShellError> {
        let mut status = 0;
        for statement in body {
            status = self.execute(statement, session)?;
            if session.exit_requested {
                break;
            }
        }
        Ok(status)
    }

    fn exec_pipeline(&mut self, pipeline: &Pipeline, session: &mut Session) -> Result<i32, ShellError> {
        let Engine { launcher, builtins } = self;

        // Expansion happens here, per execution, so a loop variable's
        // current binding is what the stage sees.
        let mut stages: Vec<(Vec<String>, &[crate::ast::Redirection])> = Vec::new();
        for stage in &pipeline.stages {
            let argv = expander::expand_words(&stage.words, &session.env);
            if argv.is_empty() {
                // a bare redirection still creates/truncates its target
                if !stage.redirs.is_empty()
                    && let Err(e) = open_redirections(&stage.redirs, &session.env)
                {
                    eprintln!("{}", e);
                    return Ok(1);
                }
                continue;
            }
            stages.push((argv, &stage.redirs));
        }

        if stages.is_empty() {
            return Ok(0);
        }

        // A sole builtin runs in-process so its session mutations stick.
        if stages.len() == 1 && builtins.is_builtin(&stages[0].0[0]) {
            let (argv, redirs) = &stages[0];
            let resolved = match open_redirections(redirs, &session.env) {
                Ok(resolved) => resolved,
                Err(e) => {
                    eprintln!("{}", e);
                    return Ok(1);
                }
            };
            let status = match resolved.stdout {
                Some(mut file) => builtins.run(argv, session, &mut file),
                None => {
                    let stdout = io::stdout();
                    let mut lock = stdout.lock();
                    let status = builtins.run(argv, session, &mut lock);
                    let _ = lock.flush();
                    status
                }
            };
            return Ok(status);
        }

        let count = stages.len();
        let mut results: Vec<StageResult<L::Handle>> = Vec::new();
        let mut prev_read: Option<OwnedFd> = None;

        for (i, (argv, redirs)) in stages.iter().enumerate() {
            let resolved = match open_redirections(redirs, &session.env) {
                Ok(resolved) => resolved,
                Err(e) => {
                    eprintln!("{}", e);
                    drop(prev_read);
                    wait_all(launcher, results)?;
                    return Ok(1);
                }
            };

            let stdin = match (resolved.stdin, prev_read.take()) {
                (Some(file), _) => Stream::File(file),
                (None, Some(fd)) => Stream::Pipe(fd),
                (None, None) => Stream::Inherit,
            };
            let last = i + 1 == count;
            let (stdout, next_read) = if last {
                (resolved.stdout.map(Stream::File).unwrap_or(Stream::Inherit), None)
            } else {
                let (read, write) = os_pipe()?;
                match resolved.stdout {
                    // redirected mid-pipeline: the file wins and the next
                    // stage reads EOF from the unused pipe
                    Some(file) => (Stream::File(file), Some(read)),
                    None => (Stream::Pipe(write), Some(read)),
                }
            };
            let stderr = resolved.stderr.map(Stream::File).unwrap_or(Stream::Inherit);
            let io = StageIo {
                stdin,
                stdout,
                stderr,
            };

            if builtins.is_builtin(&argv[0]) {
                // builtin as a pipeline stage: forked, session mutations
                // stay in the child
                let run: Box<dyn FnOnce() -> i32 + '_> = {
                    let builtins = &*builtins;
                    let session = &mut *session;
                    Box::new(move || {
                        let stdout = io::stdout();
                        let mut lock = stdout.lock();
                        let status = builtins.run(argv, session, &mut lock);
                        let _ = lock.flush();
                        status
                    })
                };
                match launcher.spawn_builtin(argv, io, run) {
                    Ok(handle) => results.push(StageResult::Running(handle)),
                    Err(e) => {
                        eprintln!("{}", e);
                        results.push(StageResult::Failed(1));
                    }
                }
            } else {
                match PathResolver::resolve(&argv[0], &session.env) {
                    Some(program) => match launcher.spawn(&program, &argv[1..], io) {
                        Ok(handle) => results.push(StageResult::Running(handle)),
                        Err(e) => {
                            eprintln!("{}", e);
                            results.push(StageResult::Failed(127));
                        }
                    },
                    None => {
                        let e = ShellError::CommandNotFound(io::Error::from_raw_os_error(
                            libc::ENOENT,
                        ));
                        eprintln!("{}", e);
                        results.push(StageResult::Failed(127));
                    }
                }
            }

            prev_read = next_read;
        }

        wait_all(launcher, results)
    }
}

/// Waits for every stage in order; the pipeline's status is the last
/// stage's status.
fn wait_all<L: Launcher>(
    launcher: &mut L,
    results: Vec<StageResult<L::Handle>>,
) -> Result<i32, ShellError> {
    let mut status = 0;
    for result in results {
        status = match result {
            StageResult::Running(handle) => launcher.wait(handle)?,
            StageResult::Failed(status) => status,
        };
    }
    Ok(status)
}

fn eval_condition(condition: &Condition, session: &Session) -> bool {
    let mut value = eval_test(&condition.head, session);
    for (op, test) in &condition.tail {
        match op {
            LogicalOp::And => {
                if value {
                    value = eval_test(test, session);
                }
            }
            LogicalOp::Or => {
                if !value {
                    value = eval_test(test, session);
                }
            }
        }
    }
    value
}

fn eval_test(test: &CondTest, session: &Session) -> bool {
    match test {
        CondTest::Single(word) => {
            let value = expander::expand_single(word, &session.env);
            !value.is_empty() && value != "false"
        }
        CondTest::Compare { lhs, op, rhs } => {
            let lhs = expander::expand_single(lhs, &session.env);
            let rhs = expander::expand_single(rhs, &session.env);
            let (Ok(lhs), Ok(rhs)) = (lhs.parse::<i64>(), rhs.parse::<i64>()) else {
                return false;
            };
            match op {
                CompareOp::Eq => lhs == rhs,
                CompareOp::Lt => lhs < rhs,
                CompareOp::Le => lhs <= rhs,
                CompareOp::Gt => lhs > rhs,
                CompareOp::Ge => lhs >= rhs,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Word;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};

    /// Records what the engine asked for instead of touching the OS.
    #[derive(Default)]
    struct FakeLauncher {
        spawns: Vec<SpawnRecord>,
        statuses: VecDeque<i32>,
    }

    struct SpawnRecord {
        program: PathBuf,
        args: Vec<String>,
        builtin: bool,
        stdin_pipe: bool,
        stdout_pipe: bool,
    }

    impl FakeLauncher {
        fn with_statuses(statuses: &[i32]) -> Self {
            FakeLauncher {
                spawns: Vec::new(),
                statuses: statuses.iter().copied().collect(),
            }
        }
    }

    impl Launcher for FakeLauncher {
        type Handle = usize;

        fn spawn(
            &mut self,
            program: &Path,
            args: &[String],
            io: StageIo,
        ) -> Result<usize, ShellError> {
            self.spawns.push(SpawnRecord {
                program: program.to_path_buf(),
                args: args.to_vec(),
                builtin: false,
                stdin_pipe: io.stdin.is_pipe(),
                stdout_pipe: io.stdout.is_pipe(),
            });
            Ok(self.spawns.len() - 1)
        }

        fn spawn_builtin(
            &mut self,
            argv: &[String],
            io: StageIo,
            _run: Box<dyn FnOnce() -> i32 + '_>,
        ) -> Result<usize, ShellError> {
            self.spawns.push(SpawnRecord {
                program: PathBuf::from(&argv[0]),
                args: argv[1..].to_vec(),
                builtin: true,
                stdin_pipe: io.stdin.is_pipe(),
                stdout_pipe: io.stdout.is_pipe(),
            });
            Ok(self.spawns.len() - 1)
        }

        fn wait(&mut self, _handle: usize) -> Result<i32, ShellError> {
            Ok(self.statuses.pop_front().unwrap_or(0))
        }
    }

    /// A session whose PATH holds exactly the commands named, backed by
    /// plain files in a temp dir so path resolution succeeds.
    fn session_with_commands(dir: &tempfile::TempDir, names: &[&str]) -> Session {
        let mut session = Session::ephemeral();
        for name in names {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        session.env.set("PATH", dir.path().to_str().unwrap());
        session
    }

    fn parse(line: &str) -> Vec<Statement> {
        let tokens = Lexer::tokenize(line).unwrap();
        Parser::new(&tokens).parse().unwrap()
    }

    fn run_line(engine: &mut Engine<FakeLauncher>, session: &mut Session, line: &str) -> i32 {
        let mut status = 0;
        for statement in parse(line) {
            status = engine.execute(&statement, session).unwrap();
        }
        status
    }

    #[test]
    fn pipeline_connects_adjacent_stages() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha", "beta"]);
        let mut engine = Engine::new(FakeLauncher::default());

        let status = run_line(&mut engine, &mut session, "alpha | beta");
        assert_eq!(status, 0);

        let spawns = &engine.launcher.spawns;
        assert_eq!(spawns.len(), 2);
        assert!(!spawns[0].stdin_pipe);
        assert!(spawns[0].stdout_pipe);
        assert!(spawns[1].stdin_pipe);
        assert!(!spawns[1].stdout_pipe);
    }

    #[test]
    fn pipeline_status_is_last_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha", "beta"]);
        let mut engine = Engine::new(FakeLauncher::with_statuses(&[1, 0]));

        let status = run_line(&mut engine, &mut session, "alpha | beta");
        assert_eq!(status, 0);
    }

    #[test]
    fn command_not_found_is_127_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &[]);
        let mut engine = Engine::new(FakeLauncher::default());

        let status = run_line(&mut engine, &mut session, "alpha | beta");
        assert_eq!(status, 127);
        // not-found stages never reach the launcher
        assert!(engine.launcher.spawns.is_empty());
    }

    #[test]
    fn and_skips_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha", "beta"]);
        let mut engine = Engine::new(FakeLauncher::with_statuses(&[1]));

        let status = run_line(&mut engine, &mut session, "alpha && beta");
        assert_eq!(status, 1);
        assert_eq!(engine.launcher.spawns.len(), 1);
    }

    #[test]
    fn or_runs_fallback_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha", "beta"]);
        let mut engine = Engine::new(FakeLauncher::with_statuses(&[1, 0]));

        let status = run_line(&mut engine, &mut session, "alpha || beta");
        assert_eq!(status, 0);
        assert_eq!(engine.launcher.spawns.len(), 2);
    }

    #[test]
    fn unsatisfied_connective_ends_the_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha", "beta", "gamma"]);
        // alpha fails, so `&& beta` is unsatisfied and `|| gamma` is never
        // reconsidered
        let mut engine = Engine::new(FakeLauncher::with_statuses(&[1]));

        let status = run_line(&mut engine, &mut session, "alpha && beta || gamma");
        assert_eq!(status, 1);
        assert_eq!(engine.launcher.spawns.len(), 1);
    }

    #[test]
    fn missing_input_redirection_aborts_the_statement() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha", "beta"]);
        let mut engine = Engine::new(FakeLauncher::default());

        let status = run_line(
            &mut engine,
            &mut session,
            "alpha < /no/such/file/anywhere | beta",
        );
        assert_eq!(status, 1);
        assert!(engine.launcher.spawns.is_empty());
    }

    #[test]
    fn sole_builtin_runs_in_process() {
        let mut session = Session::ephemeral();
        let mut engine = Engine::new(FakeLauncher::default());

        let status = run_line(&mut engine, &mut session, "exit");
        assert_eq!(status, 0);
        assert!(session.exit_requested);
        assert!(engine.launcher.spawns.is_empty());
    }

    #[test]
    fn builtin_in_pipeline_goes_through_the_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["beta"]);
        let mut engine = Engine::new(FakeLauncher::default());

        run_line(&mut engine, &mut session, "echo hi | beta");
        assert_eq!(engine.launcher.spawns.len(), 2);
        assert!(engine.launcher.spawns[0].builtin);
        assert!(engine.launcher.spawns[0].stdout_pipe);
        // the fake never runs the builtin closure, so session state is
        // untouched, matching the forked-child semantics
        assert!(!session.exit_requested);
    }

    #[test]
    fn assignment_sets_variable_and_succeeds() {
        let mut session = Session::ephemeral();
        let mut engine = Engine::new(FakeLauncher::default());

        let status = run_line(&mut engine, &mut session, "GREETING=hello");
        assert_eq!(status, 0);
        assert_eq!(session.env.get("GREETING"), Some("hello"));
    }

    #[test]
    fn for_loop_rebinds_variable_each_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha"]);
        let mut engine = Engine::new(FakeLauncher::default());

        run_line(
            &mut engine,
            &mut session,
            "for item in one two; do alpha $item; done",
        );
        let spawns = &engine.launcher.spawns;
        assert_eq!(spawns.len(), 2);
        assert_eq!(spawns[0].args, vec!["one".to_string()]);
        assert_eq!(spawns[1].args, vec!["two".to_string()]);
    }

    #[test]
    fn for_loop_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha"]);
        let mut engine = Engine::new(FakeLauncher::with_statuses(&[1, 1, 0]));

        let status = run_line(
            &mut engine,
            &mut session,
            "for item in a b c; do alpha; done",
        );
        assert_eq!(engine.launcher.spawns.len(), 3);
        assert_eq!(status, 0);
    }

    #[test]
    fn if_picks_first_true_branch() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha", "beta", "gamma"]);
        let mut engine = Engine::new(FakeLauncher::default());

        run_line(
            &mut engine,
            &mut session,
            "if [ false ]; then alpha; elif [ true ]; then beta; else gamma; fi",
        );
        let spawns = &engine.launcher.spawns;
        assert_eq!(spawns.len(), 1);
        assert!(spawns[0].program.ends_with("beta"));
    }

    #[test]
    fn numeric_comparisons_drive_branching() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha", "beta"]);
        let mut engine = Engine::new(FakeLauncher::default());

        run_line(
            &mut engine,
            &mut session,
            "if [ 1 -eq 1 ]; then alpha; else beta; fi",
        );
        assert!(engine.launcher.spawns[0].program.ends_with("alpha"));
    }

    #[test]
    fn non_numeric_comparison_is_false() {
        let session = Session::ephemeral();
        let test = CondTest::Compare {
            lhs: Word::bare("abc"),
            op: CompareOp::Eq,
            rhs: Word::bare("abc"),
        };
        assert!(!eval_test(&test, &session));
    }

    #[test]
    fn condition_variables_expand_before_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_commands(&dir, &["alpha", "beta"]);
        session.env.set("N", "5");
        let mut engine = Engine::new(FakeLauncher::default());

        run_line(
            &mut engine,
            &mut session,
            "if [ $N -gt 3 ]; then alpha; else beta; fi",
        );
        assert!(engine.launcher.spawns[0].program.ends_with("alpha"));
    }

    #[test]
    fn empty_line_of_statements_is_status_zero() {
        let mut session = Session::ephemeral();
        let mut engine = Engine::new(FakeLauncher::default());
        let pipeline = Pipeline { stages: vec![] };
        let status = engine.exec_pipeline(&pipeline, &mut session).unwrap();
        assert_eq!(status, 0);
    }
}
