use std::fmt;

use thiserror::Error;

/// Where a syntax error was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Token(String),
    End,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Token(lexeme) => write!(f, " at '{}'", lexeme),
            Location::End => write!(f, " at end"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("[line {line}] Error{at}: {message}")]
    Syntax {
        line: u32,
        at: Location,
        message: String,
    },
    #[error("[line {line}] Error: {message}")]
    Lexical { line: u32, message: String },
    #[error("Error: source is not valid UTF-8")]
    Encoding,
}

pub type CompileResult<T> = Result<T, CompileError>;
