//! Operator triggers: dispatch a day's ledger now, repair shifted ledgers.

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
};
use chrono::NaiveDate;
use intake_core::{dispatch::DispatchOutcome, ledger::RepairReport};
use serde::Deserialize;

use crate::{AppState, Error, auth::Authenticated};

#[derive(Debug, Deserialize)]
pub struct DispatchQuery {
  /// Defaults to today.
  pub date: Option<NaiveDate>,
}

/// `POST /admin/dispatch[?date=YYYY-MM-DD]`
pub async fn dispatch(
  _auth: Authenticated,
  State(state): State<AppState>,
  Query(query): Query<DispatchQuery>,
) -> (StatusCode, Json<DispatchOutcome>) {
  let date = query.date.unwrap_or_else(|| state.intake.today());
  let outcome = state.intake.dispatch(date).await;

  let status = match &outcome {
    DispatchOutcome::Delivered { .. } => StatusCode::OK,
    DispatchOutcome::NoFile => StatusCode::NOT_FOUND,
    DispatchOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
  };
  tracing::info!(%date, ?outcome, "manual dispatch");
  (status, Json(outcome))
}

/// `POST /admin/repair`
pub async fn repair(
  _auth: Authenticated,
  State(state): State<AppState>,
) -> Result<Json<RepairReport>, Error> {
  Ok(Json(state.intake.repair_all().await?))
}
