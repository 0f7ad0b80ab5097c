pub mod ast;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod expander;
pub mod history;
pub mod lexer;
pub mod parser;
pub mod prompt;
pub mod repl;
pub mod session;
pub mod z;
