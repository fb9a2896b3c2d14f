//! CSV reader.
//!
//! A small state machine over chars:
//!   FieldStart ──'"'──▶ Quoted ──'"'──▶ QuoteInQuoted ──'"'──▶ Quoted
//!        │                                   │
//!        └──other──▶ Unquoted                └──',' / EOL──▶ FieldStart

use crate::error::{Error, Result};

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
  FieldStart,
  Unquoted,
  Quoted,
  QuoteInQuoted,
}

pub(crate) fn parse(input: &str) -> Result<Vec<Vec<String>>> {
  let input = input.strip_prefix('\u{feff}').unwrap_or(input);

  let mut rows: Vec<Vec<String>> = Vec::new();
  let mut row: Vec<String> = Vec::new();
  let mut field = String::new();
  let mut state = State::FieldStart;
  let mut line = 1usize;
  let mut quote_line = 1usize;
  // Whether anything has been read since the last row ended.
  let mut row_started = false;

  let mut chars = input.chars().peekable();
  while let Some(c) = chars.next() {
    match (state, c) {
      (State::Quoted, '"') => state = State::QuoteInQuoted,
      (State::Quoted, c) => {
        if c == '\n' {
          line += 1;
        }
        field.push(c);
      }
      (State::QuoteInQuoted, '"') => {
        field.push('"');
        state = State::Quoted;
      }
      (State::FieldStart, '"') => {
        state = State::Quoted;
        quote_line = line;
        row_started = true;
      }
      (State::Unquoted, '"') | (State::QuoteInQuoted, _)
        if !matches!(c, ',' | '\r' | '\n') =>
      {
        return Err(Error::UnexpectedQuote { line });
      }
      (_, ',') => {
        row.push(std::mem::take(&mut field));
        state = State::FieldStart;
        row_started = true;
      }
      (_, '\r') if chars.peek() == Some(&'\n') => {}
      (_, '\r' | '\n') => {
        row.push(std::mem::take(&mut field));
        rows.push(std::mem::take(&mut row));
        state = State::FieldStart;
        row_started = false;
        line += 1;
      }
      (_, c) => {
        field.push(c);
        state = State::Unquoted;
        row_started = true;
      }
    }
  }

  if state == State::Quoted {
    return Err(Error::UnterminatedQuote { line: quote_line });
  }
  if row_started {
    row.push(field);
    rows.push(row);
  }
  Ok(rows)
}
