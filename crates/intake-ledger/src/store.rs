//! [`CsvLedger`], the CSV-file implementation of [`Ledger`].

use std::{
  collections::HashMap,
  io::ErrorKind,
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
};

use chrono::{NaiveDate, SecondsFormat};
use intake_core::{
  clock::{Clock, SystemClock},
  ledger::{Ledger, RepairReport},
  record::Record,
};
use tokio::io::AsyncWriteExt as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  table::{Table, reconcile, unshift},
};

const EXTENSION: &str = "csv";

// ─── Store ───────────────────────────────────────────────────────────────────

/// Ledgers stored as `<root>/YYYY-MM-DD.csv`.
///
/// Reads and rewrites of the same file are serialized by a per-path async
/// lock; files for different dates never contend.
pub struct CsvLedger {
  root:  PathBuf,
  clock: Arc<dyn Clock>,
  locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl CsvLedger {
  pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
    Self {
      root: root.into(),
      clock,
      locks: Mutex::new(HashMap::new()),
    }
  }

  pub fn with_system_clock(root: impl Into<PathBuf>) -> Self {
    Self::new(root, Arc::new(SystemClock))
  }

  pub fn root(&self) -> &Path { &self.root }

  /// Read the ledger for `date`, or `None` if there is none yet.
  pub async fn load(&self, date: NaiveDate) -> Result<Option<Table>> {
    let path = self.path_for(date);
    let _guard = self.lock(&path).await;
    Ok(read_rows(&path).await?.map(Table::from_rows))
  }

  async fn lock(&self, path: &Path) -> PathGuard<'_> {
    let lock = {
      let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
      locks.entry(path.to_path_buf()).or_default().clone()
    };
    PathGuard {
      ledger: self,
      path:   path.to_path_buf(),
      guard:  Some(lock.lock_owned().await),
    }
  }

  /// Number of paths with a lock entry, held or awaited.
  pub(crate) fn tracked_locks(&self) -> usize {
    self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
  }

  /// The `*.csv` files directly under the root, in name order.
  async fn ledger_files(&self) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(&self.root).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(Error::io(&self.root)(e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(Error::io(&self.root))? {
      let path = entry.path();
      let is_file = entry
        .file_type()
        .await
        .map_err(Error::io(&path))?
        .is_file();
      if is_file && path.extension().is_some_and(|ext| ext == EXTENSION) {
        files.push(path);
      }
    }
    files.sort();
    Ok(files)
  }

  async fn repair_locked(&self, path: &Path) -> Result<bool> {
    let _guard = self.lock(path).await;
    let Some(rows) = read_rows(path).await? else {
      return Err(Error::Io {
        path:   path.to_path_buf(),
        source: std::io::Error::from(ErrorKind::NotFound),
      });
    };
    let Some(fixed) = unshift(&rows) else {
      return Ok(false);
    };
    write_atomic(path, &intake_csv::serialize(&fixed)).await?;
    tracing::info!(path = %path.display(), "repaired shifted ledger");
    Ok(true)
  }
}

/// Exclusive access to one ledger path. On release the path's entry leaves
/// the lock map unless another task is holding or waiting on it.
struct PathGuard<'a> {
  ledger: &'a CsvLedger,
  path:   PathBuf,
  guard:  Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for PathGuard<'_> {
  fn drop(&mut self) {
    drop(self.guard.take());
    let mut locks = self.ledger.locks.lock().unwrap_or_else(|e| e.into_inner());
    if locks.get(&self.path).is_some_and(|l| Arc::strong_count(l) == 1) {
      locks.remove(&self.path);
    }
  }
}

impl Ledger for CsvLedger {
  type Error = Error;

  fn path_for(&self, date: NaiveDate) -> PathBuf {
    self
      .root
      .join(format!("{}.{EXTENSION}", date.format("%Y-%m-%d")))
  }

  async fn append(&self, date: NaiveDate, row: Record) -> Result<PathBuf> {
    let path = self.path_for(date);
    let _guard = self.lock(&path).await;

    let existing = read_rows(&path).await?.unwrap_or_default();
    let stamp = self
      .clock
      .now()
      .to_rfc3339_opts(SecondsFormat::Millis, true);
    let table = reconcile(existing, &row, &stamp);

    tokio::fs::create_dir_all(&self.root)
      .await
      .map_err(Error::io(&self.root))?;
    write_atomic(&path, &intake_csv::serialize(&table.to_rows())).await?;

    tracing::debug!(
      path = %path.display(),
      columns = table.header.len(),
      rows = table.rows.len(),
      "ledger row appended"
    );
    Ok(path)
  }

  async fn exists(&self, date: NaiveDate) -> Result<bool> {
    let path = self.path_for(date);
    tokio::fs::try_exists(&path).await.map_err(Error::io(path))
  }

  async fn repair(&self, path: &Path) -> Result<bool> { self.repair_locked(path).await }

  async fn repair_all(&self) -> Result<RepairReport> {
    let mut report = RepairReport::default();
    for path in self.ledger_files().await? {
      match self.repair_locked(&path).await {
        Ok(true) => report.repaired.push(path),
        Ok(false) => report.untouched.push(path),
        Err(e) => {
          tracing::warn!(path = %path.display(), error = %e, "ledger repair failed");
          report.failed.push((path, e.to_string()));
        }
      }
    }
    Ok(report)
  }
}

// ─── File helpers ────────────────────────────────────────────────────────────

/// Parse the file at `path`, or `None` if it does not exist.
async fn read_rows(path: &Path) -> Result<Option<Vec<Vec<String>>>> {
  let text = match tokio::fs::read_to_string(path).await {
    Ok(text) => text,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
    Err(e) => return Err(Error::io(path)(e)),
  };
  intake_csv::parse(&text)
    .map(Some)
    .map_err(|source| Error::Malformed {
      path: path.to_path_buf(),
      source,
    })
}

/// Replace `path` with `contents` via a synced sibling temp file and a
/// rename, so readers see either the old file or the new one.
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  let tmp = path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));

  let result = async {
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await
  }
  .await;

  if let Err(e) = result {
    let _ = tokio::fs::remove_file(&tmp).await;
    return Err(Error::io(path)(e));
  }
  Ok(())
}
