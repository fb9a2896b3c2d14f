//! Core types and trait definitions for the intake service.
//!
//! This crate is deliberately free of HTTP and file-format dependencies.
//! Storage backends implement [`ledger::Ledger`]; outbound transports
//! implement [`notify::Notifier`] and [`notify::CodeSender`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod dispatch;
pub mod error;
pub mod intake;
pub mod ledger;
pub mod normalize;
pub mod notify;
pub mod otp;
pub mod record;
pub mod retry;

pub use error::{Error, ErrorKind, Result};
pub use intake::{Intake, Receipt};
