//! Handlers for `/otp` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/otp` | Body: `{"identifier":"…"}`; returns 202, never the code |
//! | `POST` | `/otp/verify` | Body: `{"identifier":"…","code":"…"}` |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use intake_core::{
  Intake,
  ledger::Ledger,
  notify::{CodeSender, Notifier},
};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;

// ─── Issue ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IssueBody {
  pub identifier: String,
}

/// `POST /otp`: mint and deliver a code.
pub async fn issue<L, N, S>(
  State(intake): State<Arc<Intake<L, N, S>>>,
  Json(body): Json<IssueBody>,
) -> Result<impl IntoResponse, ApiError>
where
  L: Ledger,
  N: Notifier,
  S: CodeSender,
{
  intake.issue_otp(&body.identifier).await?;
  let expires_in_secs = intake.otp().config().expiry_secs;
  Ok((StatusCode::ACCEPTED, Json(json!({ "expires_in_secs": expires_in_secs }))))
}

// ─── Verify ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
  pub identifier: String,
  pub code:       String,
}

/// `POST /otp/verify`
pub async fn verify<L, N, S>(
  State(intake): State<Arc<Intake<L, N, S>>>,
  Json(body): Json<VerifyBody>,
) -> Result<impl IntoResponse, ApiError>
where
  L: Ledger,
  N: Notifier,
  S: CodeSender,
{
  intake.verify_otp(&body.identifier, body.code.trim())?;
  Ok(Json(json!({ "verified": true })))
}
