//! JSON REST API for the public intake triggers.
//!
//! Exposes an axum [`Router`] backed by a shared [`Intake`]. Admin triggers,
//! auth, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", intake_api::api_router(intake.clone()))
//! ```

pub mod error;
pub mod otp;
pub mod submissions;

use std::sync::Arc;

use axum::{Router, routing::post};
use intake_core::{
  Intake,
  ledger::Ledger,
  notify::{CodeSender, Notifier},
};

pub use error::ApiError;

/// Build the public API router for `intake`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<L, N, S>(intake: Arc<Intake<L, N, S>>) -> Router<()>
where
  L: Ledger + 'static,
  N: Notifier + 'static,
  S: CodeSender + 'static,
{
  Router::new()
    .route("/otp", post(otp::issue::<L, N, S>))
    .route("/otp/verify", post(otp::verify::<L, N, S>))
    .route("/submissions", post(submissions::create::<L, N, S>))
    .with_state(intake)
}

// ─── Router tests ────────────────────────────────────────────────────────────
