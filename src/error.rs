use thiserror::Error as ThisError;

use crate::interpreter::RuntimeError;
use crate::lexer::LexError;
use crate::parser::ParseError;

/// Everything `run` or `imp` can fail with. Lex and parse errors abort the
/// run outright; runtime errors unwind through the evaluator unless a `try`
/// catches them first.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    /// Error class name, as the driver reports it.
    pub fn class(&self) -> &'static str {
        match self {
            Error::Lex(_) => "SyntaxError",
            Error::Parse(_) => "ParseError",
            Error::Runtime(_) => "RuntimeError",
        }
    }
}
