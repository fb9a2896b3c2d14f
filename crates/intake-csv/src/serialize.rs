//! CSV writer. CRLF row endings per RFC 4180 §2.

fn needs_quotes(cell: &str) -> bool {
  cell.contains([',', '"', '\r', '\n'])
    || cell.starts_with(char::is_whitespace)
    || cell.ends_with(char::is_whitespace)
}

fn write_cell(out: &mut String, cell: &str) {
  if needs_quotes(cell) {
    out.push('"');
    out.push_str(&cell.replace('"', "\"\""));
    out.push('"');
  } else {
    out.push_str(cell);
  }
}

pub(crate) fn serialize<R: AsRef<[String]>>(rows: &[R]) -> String {
  let mut out = String::new();
  for row in rows {
    for (i, cell) in row.as_ref().iter().enumerate() {
      if i > 0 {
        out.push(',');
      }
      write_cell(&mut out, cell);
    }
    out.push_str("\r\n");
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse::parse;

  fn row(cells: &[&str]) -> Vec<String> { cells.iter().map(|s| s.to_string()).collect() }

  #[test]
  fn plain_cells_are_unquoted() {
    assert_eq!(serialize(&[row(&["a", "b"]), row(&["1", ""])]), "a,b\r\n1,\r\n");
  }

  #[test]
  fn special_cells_are_quoted() {
    let out = serialize(&[row(&["Doe, J", "say \"hi\"", "x\ny", " pad"])]);
    assert_eq!(out, "\"Doe, J\",\"say \"\"hi\"\"\",\"x\ny\",\" pad\"\r\n");
  }

  #[test]
  fn awkward_cells_survive_a_reparse() {
    let rows = vec![
      row(&["Name", "Notes", "added_at"]),
      row(&["", "multi\r\nline, \"quoted\"", "2026-01-01T00:00:00.000Z"]),
    ];
    assert_eq!(parse(&serialize(&rows)).unwrap(), rows);
  }

  #[test]
  fn empty_row_serializes_as_blank_line() {
    assert_eq!(serialize::<Vec<String>>(&[vec![]]), "\r\n");
  }
}
