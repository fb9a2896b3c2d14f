//! Error type for `intake-ledger`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("i/o error on {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed ledger {path}: {source}")]
  Malformed {
    path:   PathBuf,
    #[source]
    source: intake_csv::Error,
  },
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Self::Io { path, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
