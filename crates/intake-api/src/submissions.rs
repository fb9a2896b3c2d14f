//! Handler for `POST /submissions`.
//!
//! Body: `{"identifier":"9999999999","fields":{"LoanAmount":50000,…}}`.
//! Returns 201 with a [`Receipt`]; a failed notification is reported in the
//! receipt, not as an error.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use intake_core::{
  Intake, Receipt,
  ledger::Ledger,
  notify::{CodeSender, Notifier},
  record::Record,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SubmissionBody {
  pub identifier: String,
  pub fields:     Record,
}

/// `POST /submissions`
pub async fn create<L, N, S>(
  State(intake): State<Arc<Intake<L, N, S>>>,
  Json(body): Json<SubmissionBody>,
) -> Result<(StatusCode, Json<Receipt>), ApiError>
where
  L: Ledger,
  N: Notifier,
  S: CodeSender,
{
  let receipt = intake.submit(&body.identifier, &body.fields).await?;
  Ok((StatusCode::CREATED, Json(receipt)))
}
