pub mod token;

use thiserror::Error;
use token::{Quoting, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("ncsh: Invalid syntax: quote ('{0}') not terminated before end of line.")]
    UnterminatedQuote(char),
}

pub struct Lexer;

impl Lexer {
    /// Turns one line of input into a token stream. A `#` outside any quote
    /// span truncates the remainder of the line. Multi-character operators
    /// are matched greedily before single-character ones.
    pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
        let chars: Vec<char> = line.chars().collect();
        let mut tokens = Vec::new();
        let mut buf = String::new();
        let mut quote = Quoting::Unquoted;
        let mut pending = false;
        let mut pos = 0;

        fn flush(tokens: &mut Vec<Token>, buf: &mut String, quote: &mut Quoting, pending: &mut bool) {
            if !buf.is_empty() || *pending {
                tokens.push(Token::word(std::mem::take(buf), *quote));
                *quote = Quoting::Unquoted;
                *pending = false;
            }
        }

        while pos < chars.len() {
            let ch = chars[pos];
            match ch {
                ' ' | '\t' => {
                    flush(&mut tokens, &mut buf, &mut quote, &mut pending);
                    pos += 1;
                }
                '#' => {
                    // comment: drop the rest of the line
                    flush(&mut tokens, &mut buf, &mut quote, &mut pending);
                    break;
                }
                '\'' | '"' | '`' => {
                    let close = ch;
                    let mut j = pos + 1;
                    while j < chars.len() && chars[j] != close {
                        buf.push(chars[j]);
                        j += 1;
                    }
                    if j >= chars.len() {
                        return Err(LexError::UnterminatedQuote(close));
                    }
                    quote = merge_quote(quote, close);
                    pending = true;
                    pos = j + 1;
                }
                '|' => {
                    flush(&mut tokens, &mut buf, &mut quote, &mut pending);
                    if chars.get(pos + 1) == Some(&'|') {
                        tokens.push(Token::operator(TokenKind::Or, "||"));
                        pos += 2;
                    } else {
                        tokens.push(Token::operator(TokenKind::Pipe, "|"));
                        pos += 1;
                    }
                }
                '&' => {
                    flush(&mut tokens, &mut buf, &mut quote, &mut pending);
                    if chars.get(pos + 1) == Some(&'&') {
                        tokens.push(Token::operator(TokenKind::And, "&&"));
                        pos += 2;
                    } else if chars.get(pos + 1) == Some(&'>') {
                        if chars.get(pos + 2) == Some(&'>') {
                            tokens.push(Token::operator(TokenKind::RedirectBothAppend, "&>>"));
                            pos += 3;
                        } else {
                            tokens.push(Token::operator(TokenKind::RedirectBoth, "&>"));
                            pos += 2;
                        }
                    } else {
                        tokens.push(Token::operator(TokenKind::Background, "&"));
                        pos += 1;
                    }
                }
                '>' => {
                    flush(&mut tokens, &mut buf, &mut quote, &mut pending);
                    if chars.get(pos + 1) == Some(&'>') {
                        tokens.push(Token::operator(TokenKind::RedirectOutAppend, ">>"));
                        pos += 2;
                    } else {
                        tokens.push(Token::operator(TokenKind::RedirectOut, ">"));
                        pos += 1;
                    }
                }
                '<' => {
                    flush(&mut tokens, &mut buf, &mut quote, &mut pending);
                    tokens.push(Token::operator(TokenKind::RedirectIn, "<"));
                    pos += 1;
                }
                ';' => {
                    flush(&mut tokens, &mut buf, &mut quote, &mut pending);
                    tokens.push(Token::operator(TokenKind::Semicolon, ";"));
                    pos += 1;
                }
                '2' if buf.is_empty() && !pending && chars.get(pos + 1) == Some(&'>') => {
                    if chars.get(pos + 2) == Some(&'>') {
                        tokens.push(Token::operator(TokenKind::RedirectErrAppend, "2>>"));
                        pos += 3;
                    } else {
                        tokens.push(Token::operator(TokenKind::RedirectErr, "2>"));
                        pos += 2;
                    }
                }
                _ => {
                    buf.push(ch);
                    pos += 1;
                }
            }
        }

        flush(&mut tokens, &mut buf, &mut quote, &mut pending);
        Ok(tokens)
    }
}

// A word keeps the strongest quote state seen in it: single quotes and
// backticks suppress all expansion, double quotes suppress globbing.
fn merge_quote(current: Quoting, quote_char: char) -> Quoting {
    if matches!(current, Quoting::Single | Quoting::Backtick) {
        return current;
    }
    match quote_char {
        '\'' => Quoting::Single,
        '`' => Quoting::Backtick,
        '"' => Quoting::Double,
        _ => current,
    }
}
