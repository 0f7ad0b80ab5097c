use thiserror::Error;

use crate::ast::{
    CompareOp, Command, CondTest, Condition, LogicalList, LogicalOp, Pipeline, RedirMode,
    RedirTarget, Redirection, Statement, Word,
};
use crate::lexer::token::{Keyword, Quoting, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SyntaxError(pub String);

impl SyntaxError {
    fn new(message: impl Into<String>) -> SyntaxError {
        SyntaxError(message.into())
    }
}

const INVALID_SYNTAX_PIPE_FIRST_ARG: &str = "ncsh: Invalid syntax: found pipe operator ('|') as first argument. Correct usage of pipe operator is 'program1 | program2'.";
const INVALID_SYNTAX_PIPE_LAST_ARG: &str = "ncsh: Invalid syntax: found pipe operator ('|') as last argument. Correct usage of pipe operator is 'program1 | program2'.";

const INVALID_SYNTAX_STDOUT_REDIR_FIRST_ARG: &str = "ncsh: Invalid syntax: found output redirection operator ('>') as first argument. Correct usage of output redirection operator is 'program > file'.";
const INVALID_SYNTAX_STDOUT_REDIR_LAST_ARG: &str = "ncsh: Invalid syntax: found no filename after output redirect operator ('>'). Correct usage of output redirection operator is 'program > file'.";

const INVALID_SYNTAX_STDOUT_REDIR_APPEND_FIRST_ARG: &str = "ncsh: Invalid syntax: found output redirection append operator ('>>') as first argument. Correct usage of output redirection append operator is 'program >> file'.";
const INVALID_SYNTAX_STDOUT_REDIR_APPEND_LAST_ARG: &str = "ncsh: Invalid syntax: found no filename after output redirect append operator ('>>'). Correct usage of output redirection operator is 'program >> file'.";

const INVALID_SYNTAX_STDIN_REDIR_FIRST_ARG: &str = "ncsh: Invalid syntax: found input redirection operator ('<') as first argument. Correct usage of input redirection operator is 'program < file'.";
const INVALID_SYNTAX_STDIN_REDIR_LAST_ARG: &str = "ncsh: Invalid syntax: found input redirection operator ('<') as last argument. Correct usage of input redirection operator is 'program < file'.";

const INVALID_SYNTAX_STDERR_REDIR_FIRST_ARG: &str = "ncsh: Invalid syntax: found error redirection operator ('2>') as first argument. Correct usage of error redirection is 'program 2> file'.";
const INVALID_SYNTAX_STDERR_REDIR_LAST_ARG: &str = "ncsh: Invalid syntax: found error redirection operator ('2>') as last argument. Correct usage of error redirection is 'program 2> file'.";

const INVALID_SYNTAX_STDERR_REDIR_APPEND_FIRST_ARG: &str = "ncsh: Invalid syntax: found error redirection append operator ('2>>') as first argument. Correct usage of error redirection is 'program 2>> file'.";
const INVALID_SYNTAX_STDERR_REDIR_APPEND_LAST_ARG: &str = "ncsh: Invalid syntax: found error redirection operator ('2>>') as last argument. Correct usage of error redirection is 'program 2>> file'.";

const INVALID_SYNTAX_STDOUT_AND_STDERR_REDIR_FIRST_ARG: &str = "ncsh: Invalid syntax: found output & error redirection operator ('&>') as first argument. Correct usage of output & error redirection is 'program &> file'.";
const INVALID_SYNTAX_STDOUT_AND_STDERR_REDIR_LAST_ARG: &str = "ncsh: Invalid syntax: found output & error redirection operator ('&>') as last argument. Correct usage of output & error redirection is 'program &> file'.";

const INVALID_SYNTAX_STDOUT_AND_STDERR_REDIR_APPEND_FIRST_ARG: &str = "ncsh: Invalid syntax: found output & error redirection operator ('&>>') as first argument. Correct usage of output & error redirection is 'program &>> file'.";
const INVALID_SYNTAX_STDOUT_AND_STDERR_REDIR_APPEND_LAST_ARG: &str = "ncsh: Invalid syntax: found output & error redirection operator ('&>>') as last argument. Correct usage of output & error redirection is 'program &>> file'.";

const INVALID_SYNTAX_BACKGROUND_JOB_FIRST_ARG: &str = "ncsh: Invalid syntax: found background job operator ('&') as first argument. Correct usage of background job operator is 'program &'.";
const INVALID_SYNTAX_BACKGROUND_JOB_NOT_LAST_ARG: &str = "ncsh: Invalid syntax: found background job operator ('&') in position other than last argument. Correct usage of background job operator is 'program &'.";
const INVALID_SYNTAX_BACKGROUND_JOB_UNSUPPORTED: &str =
    "ncsh: Invalid syntax: background job operator ('&') is not supported.";

const INVALID_SYNTAX_AND_IN_FIRST_ARG: &str = "ncsh: Invalid syntax: found and operator ('&&') as first argument. Correct usage of and operator is 'true && true'";
const INVALID_SYNTAX_AND_IN_LAST_ARG: &str = "ncsh: Invalid syntax: found and operator ('&&') as last argument. Correct usage of and operator is 'true && true'";

const INVALID_SYNTAX_OR_IN_FIRST_ARG: &str = "ncsh: Invalid syntax: found or operator ('||') as first argument. Correct usage of or operator is 'false || true'";
const INVALID_SYNTAX_OR_IN_LAST_ARG: &str = "ncsh: Invalid syntax: found or operator ('||') as last argument. Correct usage of or operator is 'false || true'";

fn first_arg_message(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Pipe => Some(INVALID_SYNTAX_PIPE_FIRST_ARG),
        TokenKind::RedirectOut => Some(INVALID_SYNTAX_STDOUT_REDIR_FIRST_ARG),
        TokenKind::RedirectOutAppend => Some(INVALID_SYNTAX_STDOUT_REDIR_APPEND_FIRST_ARG),
        TokenKind::RedirectIn => Some(INVALID_SYNTAX_STDIN_REDIR_FIRST_ARG),
        TokenKind::RedirectErr => Some(INVALID_SYNTAX_STDERR_REDIR_FIRST_ARG),
        TokenKind::RedirectErrAppend => Some(INVALID_SYNTAX_STDERR_REDIR_APPEND_FIRST_ARG),
        TokenKind::RedirectBoth => Some(INVALID_SYNTAX_STDOUT_AND_STDERR_REDIR_FIRST_ARG),
        TokenKind::RedirectBothAppend => {
            Some(INVALID_SYNTAX_STDOUT_AND_STDERR_REDIR_APPEND_FIRST_ARG)
        }
        TokenKind::Background => Some(INVALID_SYNTAX_BACKGROUND_JOB_FIRST_ARG),
        TokenKind::And => Some(INVALID_SYNTAX_AND_IN_FIRST_ARG),
        TokenKind::Or => Some(INVALID_SYNTAX_OR_IN_FIRST_ARG),
        _ => None,
    }
}

fn last_arg_message(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Pipe => Some(INVALID_SYNTAX_PIPE_LAST_ARG),
        TokenKind::RedirectOut => Some(INVALID_SYNTAX_STDOUT_REDIR_LAST_ARG),
        TokenKind::RedirectOutAppend => Some(INVALID_SYNTAX_STDOUT_REDIR_APPEND_LAST_ARG),
        TokenKind::RedirectIn => Some(INVALID_SYNTAX_STDIN_REDIR_LAST_ARG),
        TokenKind::RedirectErr => Some(INVALID_SYNTAX_STDERR_REDIR_LAST_ARG),
        TokenKind::RedirectErrAppend => Some(INVALID_SYNTAX_STDERR_REDIR_APPEND_LAST_ARG),
        TokenKind::RedirectBoth => Some(INVALID_SYNTAX_STDOUT_AND_STDERR_REDIR_LAST_ARG),
        TokenKind::RedirectBothAppend => {
            Some(INVALID_SYNTAX_STDOUT_AND_STDERR_REDIR_APPEND_LAST_ARG)
        }
        TokenKind::And => Some(INVALID_SYNTAX_AND_IN_LAST_ARG),
        TokenKind::Or => Some(INVALID_SYNTAX_OR_IN_LAST_ARG),
        _ => None,
    }
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

// Top-down recursive descent over the validated token stream.
impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses a full line into a statement sequence. Validation runs
    /// first so no partial tree exists for a syntactically invalid line.
    pub fn parse(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        self.validate()?;
        let mut statements = Vec::new();
        loop {
            while self.consume(TokenKind::Semicolon) {}
            if self.peek().is_none() {
                break;
            }
            statements.push(self.parse_statement(&[])?);
            match self.peek().map(|t| t.kind) {
                None | Some(TokenKind::Semicolon) => {}
                Some(_) => {
                    return Err(SyntaxError::new(format!(
                        "ncsh: Invalid syntax: unexpected token '{}'.",
                        self.tokens[self.pos].lexeme
                    )));
                }
            }
        }
        Ok(statements)
    }

    /// Operator placement rules, checked before any tree is built: an
    /// operator as the very first token, a dangling operator as the very
    /// last token, and `&` in any position are rejected outright.
    fn validate(&self) -> Result<(), SyntaxError> {
        let Some(first) = self.tokens.first() else {
            return Ok(());
        };
        if let Some(message) = first_arg_message(first.kind) {
            return Err(SyntaxError::new(message));
        }
        for (i, token) in self.tokens.iter().enumerate() {
            if token.kind == TokenKind::Background {
                // background execution is unsupported: rejected everywhere
                let message = if i + 1 == self.tokens.len() {
                    INVALID_SYNTAX_BACKGROUND_JOB_UNSUPPORTED
                } else {
                    INVALID_SYNTAX_BACKGROUND_JOB_NOT_LAST_ARG
                };
                return Err(SyntaxError::new(message));
            }
        }
        if let Some(last) = self.tokens.last() {
            if let Some(message) = last_arg_message(last.kind) {
                return Err(SyntaxError::new(message));
            }
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().map(|t| t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek().map(|t| t.kind) == Some(TokenKind::Keyword(keyword))
    }

    fn expect_keyword(&mut self, keyword: Keyword, context: &str) -> Result<(), SyntaxError> {
        if self.consume(TokenKind::Keyword(keyword)) {
            Ok(())
        } else {
            Err(SyntaxError::new(format!(
                "ncsh: Invalid syntax: {}.",
                context
            )))
        }
    }

    fn expect_word(&mut self, context: &str) -> Result<Word, SyntaxError> {
        match self.next() {
            Some(token) if matches!(token.kind, TokenKind::Word | TokenKind::Keyword(_)) => {
                Ok(Word::new(token.lexeme.clone(), token.quote))
            }
            _ => Err(SyntaxError::new(format!(
                "ncsh: Invalid syntax: {}.",
                context
            ))),
        }
    }

    fn parse_statement(&mut self, terminators: &[Keyword]) -> Result<Statement, SyntaxError> {
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::Keyword(Keyword::If)) => self.parse_if(),
            Some(TokenKind::Keyword(Keyword::For)) => self.parse_for(),
            _ => {
                if let Some(assignment) = self.try_parse_assignment() {
                    return Ok(assignment);
                }
                Ok(Statement::List(self.parse_logical_list(terminators)?))
            }
        }
    }

    // NAME=value, alone as its own statement
    fn try_parse_assignment(&mut self) -> Option<Statement> {
        let token = self.peek()?;
        if token.kind != TokenKind::Word || token.quote != Quoting::Unquoted {
            return None;
        }
        let (name, value) = token.lexeme.split_once('=')?;
        if name.is_empty()
            || !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return None;
        }
        // only when the word is the entire statement
        match self.tokens.get(self.pos + 1).map(|t| t.kind) {
            None | Some(TokenKind::Semicolon) | Some(TokenKind::Keyword(_)) => {}
            Some(_) => return None,
        }
        let statement = Statement::Assignment {
            name: name.to_string(),
            value: Word::new(value.to_string(), token.quote),
        };
        self.pos += 1;
        Some(statement)
    }

    fn parse_logical_list(&mut self, terminators: &[Keyword]) -> Result<LogicalList, SyntaxError> {
        let head = self.parse_pipeline(terminators)?;
        let mut tail = Vec::new();
        loop {
            if self.consume(TokenKind::And) {
                tail.push((LogicalOp::And, self.parse_pipeline(terminators)?));
            } else if self.consume(TokenKind::Or) {
                tail.push((LogicalOp::Or, self.parse_pipeline(terminators)?));
            } else {
                break;
            }
        }
        Ok(LogicalList { head, tail })
    }

    fn parse_pipeline(&mut self, terminators: &[Keyword]) -> Result<Pipeline, SyntaxError> {
        let mut stages = vec![self.parse_command(terminators)?];
        while self.consume(TokenKind::Pipe) {
            stages.push(self.parse_command(terminators)?);
        }
        normalize_redirections(&mut stages);
        Ok(Pipeline { stages })
    }

    fn parse_command(&mut self, terminators: &[Keyword]) -> Result<Command, SyntaxError> {
        let mut words = Vec::new();
        let mut redirs = Vec::new();
        loop {
            let Some(token) = self.peek() else { break };
            match token.kind {
                TokenKind::Word => {
                    words.push(Word::new(token.lexeme.clone(), token.quote));
                    self.pos += 1;
                }
                TokenKind::Keyword(keyword) => {
                    if terminators.contains(&keyword) {
                        break;
                    }
                    // structural keywords are plain words outside their
                    // construct
                    words.push(Word::new(token.lexeme.clone(), token.quote));
                    self.pos += 1;
                }
                kind if kind.is_redirect() => {
                    self.pos += 1;
                    let (target, mode) = redirect_shape(kind);
                    let path = self.expect_word("expected filename after redirection operator")?;
                    redirs.push(Redirection { target, mode, path });
                }
                _ => break,
            }
        }
        if words.is_empty() && redirs.is_empty() {
            return Err(SyntaxError::new("ncsh: Invalid syntax: expected command."));
        }
        Ok(Command { words, redirs })
    }

    fn parse_if(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(Keyword::If, "expected 'if'")?;
        let mut branches = Vec::new();
        let condition = self.parse_condition()?;
        let body = self.parse_body(&[Keyword::Elif, Keyword::Else, Keyword::Fi])?;
        branches.push((condition, body));

        loop {
            if self.consume(TokenKind::Keyword(Keyword::Elif)) {
                let condition = self.parse_condition()?;
                let body = self.parse_body(&[Keyword::Elif, Keyword::Else, Keyword::Fi])?;
                branches.push((condition, body));
            } else if self.consume(TokenKind::Keyword(Keyword::Else)) {
                let else_body = self.parse_body(&[Keyword::Fi])?;
                self.expect_keyword(Keyword::Fi, "expected 'fi' to close if statement")?;
                return Ok(Statement::If {
                    branches,
                    else_body: Some(else_body),
                });
            } else {
                self.expect_keyword(Keyword::Fi, "expected 'fi' to close if statement")?;
                return Ok(Statement::If {
                    branches,
                    else_body: None,
                });
            }
        }
    }

    // condition clauses up to and including `then`; brackets are optional
    // and a `;` before `then` is ignored
    fn parse_condition(&mut self) -> Result<Condition, SyntaxError> {
        let head = self.parse_cond_test()?;
        let mut tail = Vec::new();
        loop {
            if self.consume(TokenKind::And) {
                tail.push((LogicalOp::And, self.parse_cond_test()?));
            } else if self.consume(TokenKind::Or) {
                tail.push((LogicalOp::Or, self.parse_cond_test()?));
            } else {
                break;
            }
        }
        self.consume(TokenKind::Semicolon);
        self.expect_keyword(Keyword::Then, "expected 'then' after if condition")?;
        Ok(Condition { head, tail })
    }

    fn parse_cond_test(&mut self) -> Result<CondTest, SyntaxError> {
        self.consume_bracket("[");
        let lhs = self.expect_word("expected operand in if condition")?;
        let test = if let Some(op) = self
            .peek()
            .filter(|t| t.kind == TokenKind::Word)
            .and_then(|t| CompareOp::from_lexeme(&t.lexeme))
        {
            self.pos += 1;
            let rhs = self.expect_word("expected operand after comparison operator")?;
            CondTest::Compare { lhs, op, rhs }
        } else {
            CondTest::Single(lhs)
        };
        self.consume_bracket("]");
        Ok(test)
    }

    fn consume_bracket(&mut self, bracket: &str) -> bool {
        if self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Word && t.lexeme == bracket)
        {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_for(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(Keyword::For, "expected 'for'")?;
        let var = match self.next() {
            Some(token) if token.kind == TokenKind::Word && token.quote == Quoting::Unquoted => {
                token.lexeme.clone()
            }
            _ => {
                return Err(SyntaxError::new(
                    "ncsh: Invalid syntax: expected variable name after 'for'.",
                ));
            }
        };
        self.expect_keyword(Keyword::In, "expected 'in' after for loop variable")?;
        let mut source = Vec::new();
        while let Some(token) = self.peek() {
            if token.kind != TokenKind::Word {
                break;
            }
            source.push(Word::new(token.lexeme.clone(), token.quote));
            self.pos += 1;
        }
        self.consume(TokenKind::Semicolon);
        self.expect_keyword(Keyword::Do, "expected 'do' in for loop")?;
        let body = self.parse_body(&[Keyword::Done])?;
        self.expect_keyword(Keyword::Done, "expected 'done' to close for loop")?;
        Ok(Statement::For { var, source, body })
    }

    fn parse_body(&mut self, terminators: &[Keyword]) -> Result<Vec<Statement>, SyntaxError> {
        let mut statements = Vec::new();
        loop {
            while self.consume(TokenKind::Semicolon) {}
            match self.peek() {
                None => {
                    return Err(SyntaxError::new(
                        "ncsh: Invalid syntax: unexpected end of input in compound statement.",
                    ));
                }
                Some(token) => {
                    if let TokenKind::Keyword(keyword) = token.kind {
                        if terminators.contains(&keyword) {
                            break;
                        }
                    }
                    statements.push(self.parse_statement(terminators)?);
                }
            }
        }
        Ok(statements)
    }
}

fn redirect_shape(kind: TokenKind) -> (RedirTarget, RedirMode) {
    match kind {
        TokenKind::RedirectIn => (RedirTarget::Stdin, RedirMode::Truncate),
        TokenKind::RedirectOut => (RedirTarget::Stdout, RedirMode::Truncate),
        TokenKind::RedirectOutAppend => (RedirTarget::Stdout, RedirMode::Append),
        TokenKind::RedirectErr => (RedirTarget::Stderr, RedirMode::Truncate),
        TokenKind::RedirectErrAppend => (RedirTarget::Stderr, RedirMode::Append),
        TokenKind::RedirectBoth => (RedirTarget::StdoutStderr, RedirMode::Truncate),
        TokenKind::RedirectBothAppend => (RedirTarget::StdoutStderr, RedirMode::Append),
        _ => unreachable!("not a redirection token"),
    }
}

// Redirections are statement-level: wherever they were written,
// stdin feeds the first stage and stdout drains from the last, so
// `sort | wc -c < in.txt` reads in.txt into sort.
fn normalize_redirections(stages: &mut [Command]) {
    let n = stages.len();
    if n < 2 {
        return;
    }
    let mut stdin_redirs = Vec::new();
    let mut stdout_redirs = Vec::new();
    for stage in stages.iter_mut() {
        let mut kept = Vec::new();
        for redir in stage.redirs.drain(..) {
            match redir.target {
                RedirTarget::Stdin => stdin_redirs.push(redir),
                RedirTarget::Stdout => stdout_redirs.push(redir),
                _ => kept.push(redir),
            }
        }
        stage.redirs = kept;
    }
    stages[0].redirs.extend(stdin_redirs);
    stages[n - 1].redirs.extend(stdout_redirs);
}
