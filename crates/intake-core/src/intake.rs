//! [`Intake`], the submission acceptor and the entry point for every
//! trigger: issue, verify, submit, dispatch now, repair.
//!
//! One value is built per process and shared by reference (`Arc`) between
//! request handlers and the scheduler. Its OTP table lives and dies with it.

use std::{path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
  Error, Result,
  clock::Clock,
  dispatch::{DispatchConfig, DispatchOutcome, Dispatcher},
  ledger::{Ledger, RepairReport},
  normalize::normalize,
  notify::{CodeSender, Notifier},
  otp::{Issued, OtpConfig, OtpVerifier, validate_identifier},
  record::Record,
};

/// What a caller learns about an accepted submission.
///
/// `notification` may be a failure: the submission is already recorded and
/// is not rolled back.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
  pub ledger_date:  NaiveDate,
  pub ledger_path:  PathBuf,
  pub notification: DispatchOutcome,
}

pub struct Intake<L, N, S> {
  otp:         OtpVerifier,
  ledger:      Arc<L>,
  dispatcher:  Dispatcher<L, N>,
  code_sender: Arc<S>,
  clock:       Arc<dyn Clock>,
}

impl<L, N, S> Intake<L, N, S>
where
  L: Ledger,
  N: Notifier,
  S: CodeSender,
{
  pub fn new(
    ledger: Arc<L>,
    notifier: Arc<N>,
    code_sender: Arc<S>,
    clock: Arc<dyn Clock>,
    otp: OtpConfig,
    dispatch: DispatchConfig,
  ) -> Self {
    Self {
      otp: OtpVerifier::new(otp, clock.clone()),
      dispatcher: Dispatcher::new(ledger.clone(), notifier, dispatch),
      ledger,
      code_sender,
      clock,
    }
  }

  pub fn otp(&self) -> &OtpVerifier { &self.otp }

  pub fn ledger(&self) -> &L { &self.ledger }

  pub fn dispatcher(&self) -> &Dispatcher<L, N> { &self.dispatcher }

  pub fn today(&self) -> NaiveDate { self.clock.today() }

  /// Mint a code for `identifier` and deliver it.
  ///
  /// If delivery fails the record is withdrawn so the caller is not held
  /// behind a cooldown for a code they never received.
  pub async fn issue_otp(&self, identifier: &str) -> Result<Issued> {
    let issued = self.otp.issue(identifier)?;
    if let Err(e) = self.code_sender.send_code(identifier, &issued.code).await {
      self.otp.revoke(identifier, &issued.code);
      tracing::warn!(error = %e, "otp delivery failed");
      return Err(Error::Delivery(e.to_string()));
    }
    tracing::info!(expires_at = %issued.expires_at, "otp issued");
    Ok(issued)
  }

  pub fn verify_otp(&self, identifier: &str, code: &str) -> Result<()> {
    let result = self.otp.verify(identifier, code);
    if let Err(ref e) = result {
      tracing::info!(error = %e, "otp verification rejected");
    }
    result
  }

  /// Accept a submission from a verified identifier.
  ///
  /// The verification is consumed first, so a failed append still requires
  /// a fresh issue → verify round. Delivery of the updated ledger is awaited
  /// and its outcome reported in the [`Receipt`].
  pub async fn submit(&self, identifier: &str, fields: &Record) -> Result<Receipt> {
    validate_identifier(identifier)?;
    if !self.otp.consume(identifier) {
      return Err(Error::NotVerified);
    }

    let row = normalize(fields);
    let date = self.clock.today();
    let ledger_path = self
      .ledger
      .append(date, row)
      .await
      .map_err(|e| Error::LedgerWriteFailed(Box::new(e)))?;
    tracing::info!(%date, path = %ledger_path.display(), "submission recorded");

    let notification = self.dispatcher.dispatch_ledger(date).await;
    Ok(Receipt {
      ledger_date: date,
      ledger_path,
      notification,
    })
  }

  pub async fn dispatch(&self, date: NaiveDate) -> DispatchOutcome {
    self.dispatcher.dispatch_ledger(date).await
  }

  pub async fn dispatch_today(&self) -> DispatchOutcome {
    self.dispatch(self.clock.today()).await
  }

  pub async fn repair_all(&self) -> Result<RepairReport> {
    let report = self
      .ledger
      .repair_all()
      .await
      .map_err(|e| Error::LedgerRepairFailed(Box::new(e)))?;
    tracing::info!(
      repaired = report.repaired.len(),
      untouched = report.untouched.len(),
      failed = report.failed.len(),
      "ledger repair finished"
    );
    Ok(report)
  }
}
