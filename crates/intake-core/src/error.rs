//! Error types for `intake-core`.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("identifier must be exactly 10 digits, got {0:?}")]
  InvalidIdentifier(String),

  #[error("code must be {expected} digits")]
  InvalidCode { expected: u32 },

  #[error("a code was sent recently; retry in {remaining_secs}s")]
  Cooldown { remaining_secs: u64 },

  #[error("no active code for this identifier")]
  NotFound,

  #[error("too many incorrect attempts; request a new code")]
  TooManyAttempts,

  #[error("incorrect code; {attempts_remaining} attempt(s) remaining")]
  Mismatch { attempts_remaining: u32 },

  #[error("identifier has not been verified")]
  NotVerified,

  #[error("ledger write failed: {0}")]
  LedgerWriteFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("ledger repair failed: {0}")]
  LedgerRepairFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("delivery failed: {0}")]
  Delivery(String),
}

impl Error {
  /// Classify this error into the coarse taxonomy callers act on.
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidIdentifier(_) | Self::InvalidCode { .. } => {
        ErrorKind::Validation
      }
      Self::Cooldown { .. } => ErrorKind::RateLimited,
      Self::NotFound
      | Self::TooManyAttempts
      | Self::Mismatch { .. }
      | Self::NotVerified => ErrorKind::Auth,
      Self::LedgerWriteFailed(_) | Self::LedgerRepairFailed(_) => {
        ErrorKind::Storage
      }
      Self::Delivery(_) => ErrorKind::Delivery,
    }
  }
}

/// How a caller should react to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// Malformed input; rejected before any state was touched.
  Validation,
  /// Retryable after the stated wait.
  RateLimited,
  /// The issue → verify flow must be restarted.
  Auth,
  /// Ledger I/O failed; the append did not happen.
  Storage,
  /// Outbound send failed after exhausting retries.
  Delivery,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
