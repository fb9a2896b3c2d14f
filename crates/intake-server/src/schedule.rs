//! Daily dispatch at a fixed local wall-clock time.

use std::sync::Arc;

use chrono::{DateTime, Local, LocalResult, NaiveTime, TimeZone};
use intake_core::{
  Intake,
  dispatch::DispatchOutcome,
  ledger::Ledger,
  notify::{CodeSender, Notifier},
};

/// The first instant strictly after `now` whose wall-clock time in `now`'s
/// zone is `at`.
///
/// Days on which `at` does not exist (a DST gap) are skipped. When `at`
/// occurs twice, the earlier instant wins.
pub fn next_fire<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> Option<DateTime<Tz>> {
  let tz = now.timezone();
  let mut date = now.date_naive();
  for _ in 0..3 {
    let fire = match tz.from_local_datetime(&date.and_time(at)) {
      LocalResult::Single(t) => Some(t),
      // Order of the pair is zone-specific; `Local` puts the later one first.
      LocalResult::Ambiguous(a, b) => Some(a.min(b)),
      LocalResult::None => None,
    };
    if let Some(fire) = fire
      && fire > *now
    {
      return Some(fire);
    }
    date = date.succ_opt()?;
  }
  None
}

/// Sleep until each day's `at` and dispatch that day's ledger. Never returns.
pub async fn run_daily<L, N, S>(intake: Arc<Intake<L, N, S>>, at: NaiveTime)
where
  L: Ledger,
  N: Notifier,
  S: CodeSender,
{
  loop {
    let now = Local::now();
    let Some(fire) = next_fire(&now, at) else {
      tracing::error!(%at, "no upcoming dispatch time; scheduler stopped");
      return;
    };
    tracing::debug!(%fire, "next scheduled dispatch");
    let wait = (fire - now).to_std().unwrap_or_default();
    tokio::time::sleep(wait).await;

    let date = intake.today();
    let outcome = intake.dispatch(date).await;
    match outcome {
      DispatchOutcome::Failed { error, attempts } => {
        tracing::error!(%date, attempts, %error, "scheduled dispatch failed");
      }
      outcome => tracing::info!(%date, ?outcome, "scheduled dispatch"),
    }
  }
}
