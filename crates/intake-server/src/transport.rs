//! Concrete outbound channels for ledger notifications and OTP codes.
//!
//! `log` records what would have been sent; `outbox` spools each message to
//! a directory for an external mailer to pick up.

use std::path::{Path, PathBuf};

use chrono::Utc;
use intake_core::notify::{CodeSender, Message, Notifier};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::expand_tilde;

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("i/o error on {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("could not encode message: {0}")]
  Json(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> TransportError + '_ {
  move |source| TransportError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// Which notifier the server builds, as read from configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
  #[default]
  Log,
  Outbox {
    dir: PathBuf,
  },
}

// ─── Notifiers ───────────────────────────────────────────────────────────────

pub enum Transport {
  Log,
  Outbox(Outbox),
}

impl Transport {
  pub fn from_config(config: &TransportConfig) -> Self {
    match config {
      TransportConfig::Log => Self::Log,
      TransportConfig::Outbox { dir } => Self::Outbox(Outbox::new(expand_tilde(dir))),
    }
  }
}

impl Notifier for Transport {
  type Error = TransportError;

  async fn send(&self, message: &Message) -> Result<(), TransportError> {
    match self {
      Self::Log => {
        let attachments: Vec<&str> =
          message.attachments.iter().map(|a| a.filename.as_str()).collect();
        tracing::info!(
          to = %message.to,
          subject = %message.subject,
          ?attachments,
          "notification (log transport)"
        );
        Ok(())
      }
      Self::Outbox(outbox) => outbox.spool(message).await.map(|_| ()),
    }
  }
}

/// Spools messages as `<dir>/<timestamp>-<uuid>/message.json` plus a copy of
/// each attachment.
pub struct Outbox {
  dir: PathBuf,
}

impl Outbox {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  pub fn dir(&self) -> &Path { &self.dir }

  /// Write `message` into a fresh spool entry and return its directory.
  pub async fn spool(&self, message: &Message) -> Result<PathBuf, TransportError> {
    let entry = self.dir.join(format!(
      "{}-{}",
      Utc::now().format("%Y%m%dT%H%M%S%3f"),
      Uuid::new_v4().simple()
    ));
    tokio::fs::create_dir_all(&entry).await.map_err(io_err(&entry))?;

    for attachment in &message.attachments {
      let target = entry.join(&attachment.filename);
      tokio::fs::copy(&attachment.path, &target)
        .await
        .map_err(io_err(&attachment.path))?;
    }

    let json = serde_json::to_vec_pretty(message)?;
    let target = entry.join("message.json");
    tokio::fs::write(&target, json).await.map_err(io_err(&target))?;

    tracing::info!(entry = %entry.display(), subject = %message.subject, "message spooled");
    Ok(entry)
  }
}

// ─── OTP delivery ────────────────────────────────────────────────────────────

/// Logs codes at `debug` instead of sending them. Development only.
pub struct LogCodeSender;

impl CodeSender for LogCodeSender {
  type Error = std::convert::Infallible;

  async fn send_code(&self, identifier: &str, code: &str) -> Result<(), Self::Error> {
    tracing::debug!(identifier = %mask(identifier), code, "otp code (log transport)");
    Ok(())
  }
}

/// Everything but the last four characters replaced with `*`.
fn mask(identifier: &str) -> String {
  let keep = identifier.chars().count().saturating_sub(4);
  identifier
    .chars()
    .enumerate()
    .map(|(i, c)| if i < keep { '*' } else { c })
    .collect()
}
