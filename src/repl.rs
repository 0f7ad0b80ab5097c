use crate::config::Config;
use crate::error::ShellError;
use crate::executor::Engine;
use crate::executor::spawn::Launcher;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::prompt::ShellPrompt;
use crate::session::Session;

/// The interactive loop: prompt, read, record, execute, repeat until an
/// exit builtin or EOF. Returns the shell's exit status.
pub fn run(config: &Config) -> i32 {
    let mut session = Session::new(config);
    let mut engine = Engine::with_os_launcher();
    let prompt = ShellPrompt::new(&config.prompt);

    loop {
        prompt.show();
        let line = match prompt.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("ncsh: Error reading input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        session.history.add(&line);
        run_line(&mut engine, &mut session, &line);
        if session.exit_requested {
            session.last_status = 0;
            break;
        }
    }

    session.persist();
    session.last_status
}

/// Noninteractive mode: execute one line against a session that leaves no
/// trace in the history or z database.
pub fn run_once(line: &str) -> i32 {
    let mut session = Session::ephemeral();
    let mut engine = Engine::with_os_launcher();
    run_line(&mut engine, &mut session, line);
    session.last_status
}

/// One input line through the lex/parse/execute chain. Every failure is
/// reported on stderr and folded into `session.last_status`; the caller
/// decides whether the session continues.
pub fn run_line<L: Launcher>(engine: &mut Engine<L>, session: &mut Session, line: &str) {
    let tokens = match Lexer::tokenize(line) {
        Ok(tokens) => tokens,
        Err(e) => return report(session, e.into()),
    };
    let statements = match Parser::new(&tokens).parse() {
        Ok(statements) => statements,
        Err(e) => return report(session, e.into()),
    };
    for statement in &statements {
        match engine.execute(statement, session) {
            Ok(status) => session.last_status = status,
            Err(e) => report(session, e),
        }
        if session.exit_requested {
            break;
        }
    }
}

fn report(session: &mut Session, e: ShellError) {
    eprintln!("{}", e);
    session.last_status = e.status();
}
