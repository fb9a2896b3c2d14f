//! Pure header/row logic: schema reconciliation and shift repair.
//!
//! Column order is append-monotonic within a day: columns are only ever added
//! just before `added_at`, never reordered or removed. Repair's shift
//! detection relies on that.

use std::collections::HashMap;

use intake_core::{ledger::ADDED_AT, record::Record};

/// A ledger file's content: header plus data rows aligned to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
  pub header: Vec<String>,
  pub rows:   Vec<Vec<String>>,
}

impl Table {
  /// Split raw CSV rows into header and data rows.
  pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
    if rows.is_empty() {
      return Self::default();
    }
    let header = rows.remove(0);
    Self { header, rows }
  }

  pub fn to_rows(&self) -> Vec<Vec<String>> {
    std::iter::once(self.header.clone())
      .chain(self.rows.iter().cloned())
      .collect()
  }

  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.header.iter().position(|h| h == name)
  }

  /// The cell at data row `row` under column `name`.
  pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
    let col = self.column_index(name)?;
    self.rows.get(row)?.get(col).map(String::as_str)
  }
}

fn is_blank_row(row: &[String]) -> bool { row.iter().all(|c| c.trim().is_empty()) }

/// The first non-blank cell of `row` among `positions`, else empty.
fn merged_cell(row: &[String], positions: &[usize]) -> String {
  positions
    .iter()
    .filter_map(|&i| row.get(i))
    .find(|c| !c.trim().is_empty())
    .cloned()
    .unwrap_or_default()
}

/// Merge `row` into the raw rows of an existing file (empty for a new file).
///
/// The header becomes the existing columns, then `row`'s new fields in
/// first-seen order, then [`ADDED_AT`]. Header cells are trimmed; blank ones
/// are dropped and duplicates fold into the first occurrence, each row taking
/// its first non-blank cell among them. Existing data rows are re-aligned by
/// column name, entirely empty rows are dropped, and `row` is appended with
/// `added_at` set to `stamp`.
pub(crate) fn reconcile(existing: Vec<Vec<String>>, row: &Record, stamp: &str) -> Table {
  let old = Table::from_rows(existing);

  // Column name → positions in the old file, in header order.
  let mut old_index: HashMap<String, Vec<usize>> = HashMap::new();
  let mut columns: Vec<String> = Vec::new();
  for (i, cell) in old.header.iter().enumerate() {
    let name = cell.trim();
    if name.is_empty() {
      continue;
    }
    match old_index.get_mut(name) {
      Some(positions) => {
        tracing::warn!(column = name, position = i, "duplicate ledger column merged");
        positions.push(i);
      }
      None => {
        old_index.insert(name.to_owned(), vec![i]);
        if name != ADDED_AT {
          columns.push(name.to_owned());
        }
      }
    }
  }

  // Trimmed field name → value; first occurrence wins.
  let mut incoming: HashMap<&str, String> = HashMap::new();
  for (name, value) in row.iter() {
    let name = name.trim();
    if name.is_empty() || name == ADDED_AT || incoming.contains_key(name) {
      continue;
    }
    incoming.insert(name, value.to_cell());
    if !old_index.contains_key(name) {
      columns.push(name.to_owned());
    }
  }
  columns.push(ADDED_AT.to_owned());

  let mut rows: Vec<Vec<String>> = old
    .rows
    .iter()
    .filter(|r| !is_blank_row(r))
    .map(|r| {
      columns
        .iter()
        .map(|c| {
          old_index
            .get(c.as_str())
            .map(|positions| merged_cell(r, positions))
            .unwrap_or_default()
        })
        .collect()
    })
    .collect();

  rows.push(
    columns
      .iter()
      .map(|c| match c.as_str() {
        ADDED_AT => stamp.to_owned(),
        name => incoming.get(name).cloned().unwrap_or_default(),
      })
      .collect(),
  );

  Table {
    header: columns,
    rows,
  }
}

/// Whether the first row shows the right-shift signature: an empty first
/// cell followed by a non-empty second cell.
pub(crate) fn is_shifted(rows: &[Vec<String>]) -> bool {
  let Some(first) = rows.first() else {
    return false;
  };
  let lead_empty = first.first().is_none_or(|c| c.trim().is_empty());
  let second_set = first.get(1).is_some_and(|c| !c.trim().is_empty());
  lead_empty && second_set
}

/// Undo a one-column right shift, or `None` if the signature is absent.
///
/// The header loses its spurious leading cell; every data row is shifted
/// left by one and padded with empty cells to the header's width.
pub(crate) fn unshift(rows: &[Vec<String>]) -> Option<Vec<Vec<String>>> {
  if !is_shifted(rows) {
    return None;
  }
  let header: Vec<String> = rows[0][1..].to_vec();
  let width = header.len();
  let mut out = Vec::with_capacity(rows.len());
  out.push(header);
  for row in &rows[1..] {
    let mut cells: Vec<String> = row.get(1..).map(<[String]>::to_vec).unwrap_or_default();
    if cells.len() < width {
      cells.resize(width, String::new());
    }
    out.push(cells);
  }
  Some(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  const STAMP: &str = "2026-06-01T10:00:00.000Z";

  fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data
      .iter()
      .map(|r| r.iter().map(|c| c.to_string()).collect())
      .collect()
  }

  #[test]
  fn fresh_table_takes_record_order_plus_stamp() {
    let record = Record::new()
      .with("LoanAmount", 50_000_i64)
      .with("Mobile", "9999999999");
    let table = reconcile(Vec::new(), &record, STAMP);
    assert_eq!(table.header, ["LoanAmount", "Mobile", ADDED_AT]);
    assert_eq!(table.rows, [["50000", "9999999999", STAMP]]);
  }

  #[test]
  fn keys_are_trimmed_and_blank_keys_dropped() {
    let record = Record::new().with("  City ", "Pune").with("   ", "lost");
    let table = reconcile(Vec::new(), &record, STAMP);
    assert_eq!(table.header, ["City", ADDED_AT]);
  }

  #[test]
  fn caller_cannot_supply_added_at() {
    let record = Record::new().with(ADDED_AT, "forged").with("City", "Goa");
    let table = reconcile(Vec::new(), &record, STAMP);
    assert_eq!(table.header, ["City", ADDED_AT]);
    assert_eq!(table.rows[0], ["Goa", STAMP]);
  }

  #[test]
  fn new_column_is_inserted_before_added_at() {
    let existing = rows(&[
      &["LoanAmount", "Mobile", ADDED_AT],
      &["50000", "9999999999", "t1"],
    ]);
    let record = Record::new().with("Mobile", "8888888888").with("City", "Pune");
    let table = reconcile(existing, &record, STAMP);

    assert_eq!(table.header, ["LoanAmount", "Mobile", "City", ADDED_AT]);
    assert_eq!(table.rows, rows(&[
      &["50000", "9999999999", "", "t1"],
      &["", "8888888888", "Pune", STAMP],
    ]));
  }

  #[test]
  fn short_rows_are_padded_and_blank_rows_dropped() {
    let existing = rows(&[
      &["A", "B", ADDED_AT],
      &["1"],
      &["", " ", ""],
      &[""],
    ]);
    let table = reconcile(existing, &Record::new().with("A", "2"), STAMP);
    assert_eq!(table.rows, rows(&[&["1", "", ""], &["2", "", STAMP]]));
  }

  #[test]
  fn header_without_added_at_gains_it_last() {
    let existing = rows(&[&["A", "B"], &["1", "2"]]);
    let table = reconcile(existing, &Record::new().with("C", "3"), STAMP);
    assert_eq!(table.header, ["A", "B", "C", ADDED_AT]);
    assert_eq!(table.rows[0], ["1", "2", "", ""]);
  }

  #[test]
  fn duplicate_header_cells_keep_first() {
    let existing = rows(&[&["A", " A", ADDED_AT], &["first", "second", "t"]]);
    let table = reconcile(existing, &Record::new(), STAMP);
    assert_eq!(table.header, ["A", ADDED_AT]);
    assert_eq!(table.rows[0], ["first", "t"]);
  }

  #[test]
  fn duplicate_column_data_survives_when_first_is_blank() {
    let existing = rows(&[
      &["A", "B", " A", ADDED_AT],
      &["", "b1", "only-in-second", "t1"],
      &["a2", "b2", "", "t2"],
    ]);
    let table = reconcile(existing, &Record::new().with("B", "b3"), STAMP);
    assert_eq!(table.header, ["A", "B", ADDED_AT]);
    assert_eq!(table.rows, rows(&[
      &["only-in-second", "b1", "t1"],
      &["a2", "b2", "t2"],
      &["", "b3", STAMP],
    ]));
  }

  #[test]
  fn shifted_table_is_detected_and_unshifted() {
    let shifted = rows(&[
      &["", "Name", "City", ADDED_AT],
      &["", "Asha", "Pune", "t1"],
      &["", "Ravi"],
    ]);
    let fixed = unshift(&shifted).unwrap();
    assert_eq!(fixed, rows(&[
      &["Name", "City", ADDED_AT],
      &["Asha", "Pune", "t1"],
      &["Ravi", "", ""],
    ]));
    assert!(unshift(&fixed).is_none());
  }

  #[test]
  fn other_damage_is_left_alone() {
    assert!(unshift(&[]).is_none());
    assert!(unshift(&rows(&[&["", ""], &["x", "y"]])).is_none());
    assert!(unshift(&rows(&[&["Name", "", "City"]])).is_none());
  }
}
