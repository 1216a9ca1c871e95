//! Parse failure type shared by the OBJ and MTL parsers.

use thiserror::Error;

/// A malformed asset line. Fatal to that asset load, not to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at line {line}: {message}")]
pub struct ParseError {
    /// 1-based line number in the source text.
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}
