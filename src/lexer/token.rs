/// Quote state of a word token. Expansion is skipped for single-quoted and
/// backtick spans, applied for double-quoted and unquoted words; glob
/// expansion only happens on unquoted words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    Unquoted,
    Single,
    Double,
    Backtick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Elif,
    Else,
    Then,
    Fi,
    For,
    In,
    Do,
    Done,
}

impl Keyword {
    pub fn from_lexeme(s: &str) -> Option<Keyword> {
        match s {
            "if" => Some(Keyword::If),
            "elif" => Some(Keyword::Elif),
            "else" => Some(Keyword::Else),
            "then" => Some(Keyword::Then),
            "fi" => Some(Keyword::Fi),
            "for" => Some(Keyword::For),
            "in" => Some(Keyword::In),
            "do" => Some(Keyword::Do),
            "done" => Some(Keyword::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Keyword(Keyword),
    Pipe,               // |
    And,                // &&
    Or,                 // ||
    Semicolon,          // ;
    Background,         // &
    RedirectIn,         // <
    RedirectOut,        // >
    RedirectOutAppend,  // >>
    RedirectErr,        // 2>
    RedirectErrAppend,  // 2>>
    RedirectBoth,       // &>
    RedirectBothAppend, // &>>
}

impl TokenKind {
    pub fn is_redirect(&self) -> bool {
        matches!(
            self,
            TokenKind::RedirectIn
                | TokenKind::RedirectOut
                | TokenKind::RedirectOutAppend
                | TokenKind::RedirectErr
                | TokenKind::RedirectErrAppend
                | TokenKind::RedirectBoth
                | TokenKind::RedirectBothAppend
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub quote: Quoting,
}

impl Token {
    pub fn word(lexeme: impl Into<String>, quote: Quoting) -> Token {
        let lexeme = lexeme.into();
        let kind = if quote == Quoting::Unquoted {
            Keyword::from_lexeme(&lexeme).map_or(TokenKind::Word, TokenKind::Keyword)
        } else {
            TokenKind::Word
        };
        Token { kind, lexeme, quote }
    }

    pub fn operator(kind: TokenKind, lexeme: &str) -> Token {
        Token {
            kind,
            lexeme: lexeme.to_string(),
            quote: Quoting::Unquoted,
        }
    }
}
