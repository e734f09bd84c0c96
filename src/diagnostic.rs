use std::fmt;

use thiserror::Error;

use crate::interpreter::error::RuntimeError;
use crate::interpreter::parser::ParseError;
use crate::lexer::LexError;

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loc {
    pub line: u32,
    pub column: u32,
}

impl Loc {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Any fatal error a run of Boa source can produce. Rendering follows the
/// one-line diagnostic format `<Kind>: <message> at line L, column C`.
#[derive(Debug, Clone, Error)]
pub enum BoaError {
    #[error("SyntaxError: {0}")]
    Syntax(#[from] LexError),
    #[error("ParseError: {0}")]
    Parse(#[from] ParseError),
    #[error("RuntimeError: {0}")]
    Runtime(#[from] RuntimeError),
}
