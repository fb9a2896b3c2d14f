//! The [`Ledger`] trait: one append-only tabular file per calendar day.
//!
//! Implemented by storage backends (e.g. `intake-ledger`). The dispatcher and
//! the submission acceptor depend on this abstraction only.

use std::{
  future::Future,
  path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::Record;

/// The column every backend appends last, stamped at write time.
pub const ADDED_AT: &str = "added_at";

/// Result of repairing every ledger under a storage root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
  /// Files whose shifted columns were corrected.
  pub repaired:  Vec<PathBuf>,
  /// Files that did not show the shift pattern and were left alone.
  pub untouched: Vec<PathBuf>,
  /// Files that could not be read or rewritten, with the reason.
  pub failed:    Vec<(PathBuf, String)>,
}

pub trait Ledger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Deterministic location of the ledger for `date`.
  fn path_for(&self, date: NaiveDate) -> PathBuf;

  /// Append `row` to the ledger for `date`, creating the file if needed.
  ///
  /// The header becomes the union of the existing columns and `row`'s
  /// fields, with new columns added just before [`ADDED_AT`]. Existing rows
  /// are re-aligned to the new header. On error nothing was written.
  fn append(
    &self,
    date: NaiveDate,
    row: Record,
  ) -> impl Future<Output = Result<PathBuf, Self::Error>> + Send + '_;

  fn exists(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Undo a one-column right shift of the header and every row.
  ///
  /// Returns whether the file changed. Idempotent.
  fn repair<'a>(
    &'a self,
    path: &'a Path,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// [`repair`](Self::repair) every ledger under the storage root.
  fn repair_all(
    &self,
  ) -> impl Future<Output = Result<RepairReport, Self::Error>> + Send + '_;
}
