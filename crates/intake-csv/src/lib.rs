//! RFC 4180 CSV codec for intake ledgers.
//!
//! Converts between CSV text and rows of string cells. Pure synchronous; no
//! knowledge of headers, columns or the ledger layout.
//!
//! # Quick start
//!
//! ```
//! let rows = intake_csv::parse("Name,City\r\n\"Doe, J\",Pune\r\n").unwrap();
//! assert_eq!(rows[1], ["Doe, J", "Pune"]);
//! assert_eq!(intake_csv::serialize(&rows), "Name,City\r\n\"Doe, J\",Pune\r\n");
//! ```

pub mod error;
mod parse;
mod serialize;

pub use error::{Error, Result};

/// Parse `input` into rows of cells.
///
/// Accepts CRLF or bare LF line endings and skips a leading UTF-8 BOM. A
/// trailing line break does not produce an extra row; a blank line in the
/// middle yields a row with one empty cell.
pub fn parse(input: &str) -> Result<Vec<Vec<String>>> { parse::parse(input) }

/// Serialize `rows` as CSV with CRLF row endings.
pub fn serialize<R: AsRef<[String]>>(rows: &[R]) -> String {
  serialize::serialize(rows)
}
