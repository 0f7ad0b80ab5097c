use crate::lexer::token::Quoting;

/// A word as it left the parser: raw text plus the quote state the lexer
/// recorded. Expansion happens at execution time so loop variables pick up
/// their per-iteration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub quote: Quoting,
}

impl Word {
    pub fn new(text: impl Into<String>, quote: Quoting) -> Word {
        Word {
            text: text.into(),
            quote,
        }
    }

    pub fn bare(text: impl Into<String>) -> Word {
        Word::new(text, Quoting::Unquoted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirTarget {
    Stdin,
    Stdout,
    Stderr,
    StdoutStderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirMode {
    Truncate,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub target: RedirTarget,
    pub mode: RedirMode,
    pub path: Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub words: Vec<Word>,
    pub redirs: Vec<Redirection>,
}

/// One or more commands connected stdout to stdin. Stdin redirections live
/// on the first stage and stdout redirections on the last; the parser
/// normalizes placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Pipelines joined by `&&`/`||`, evaluated left to right with
/// short-circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalList {
    pub head: Pipeline,
    pub tail: Vec<(LogicalOp, Pipeline)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq, // -eq
    Lt, // -lt
    Le, // -le
    Gt, // -gt
    Ge, // -ge
}

impl CompareOp {
    pub fn from_lexeme(s: &str) -> Option<CompareOp> {
        match s {
            "-eq" => Some(CompareOp::Eq),
            "-lt" => Some(CompareOp::Lt),
            "-le" => Some(CompareOp::Le),
            "-gt" => Some(CompareOp::Gt),
            "-ge" => Some(CompareOp::Ge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CondTest {
    /// A lone operand: `true`, `false`, or anything else (non-empty after
    /// expansion counts as true).
    Single(Word),
    Compare {
        lhs: Word,
        op: CompareOp,
        rhs: Word,
    },
}

/// Condition clauses joined by `&&`/`||` at uniform precedence, combined
/// left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub head: CondTest,
    pub tail: Vec<(LogicalOp, CondTest)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    List(LogicalList),
    If {
        branches: Vec<(Condition, Vec<Statement>)>,
        else_body: Option<Vec<Statement>>,
    },
    For {
        var: String,
        source: Vec<Word>,
        body: Vec<Statement>,
    },
    Assignment {
        name: String,
        value: Word,
    },
}
