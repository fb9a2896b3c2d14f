//! Error types for the intake-csv codec.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("unterminated quoted field starting on line {line}")]
  UnterminatedQuote { line: usize },

  #[error("unexpected quote on line {line}")]
  UnexpectedQuote { line: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
