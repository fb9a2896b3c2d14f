//! Outbound capabilities: ledger notifications and OTP code delivery.
//!
//! The transport behind each trait is opaque to this crate. Implementations
//! live in the server binary (and in test doubles).

use std::{future::Future, path::PathBuf};

use serde::{Deserialize, Serialize};

/// A file carried alongside a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub filename: String,
  pub path:     PathBuf,
}

/// A message handed to a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub from:        String,
  pub to:          String,
  pub subject:     String,
  pub body_text:   String,
  #[serde(default)]
  pub attachments: Vec<Attachment>,
}

/// Delivers a [`Message`] over some outbound channel.
///
/// Timeouts, if any, are the transport's business.
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send<'a>(
    &'a self,
    message: &'a Message,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Delivers a freshly minted one-time code to the holder of `identifier`.
pub trait CodeSender: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send_code<'a>(
    &'a self,
    identifier: &'a str,
    code: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
