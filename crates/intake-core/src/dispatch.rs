//! Notification dispatcher. Delivers a day's ledger under a global cap on
//! concurrent sends, retrying each send with exponential backoff.
//!
//! The admission gate is a [`tokio::sync::Semaphore`], which grants permits
//! in request order: a released slot goes straight to the longest-waiting
//! caller. A send that never resolves holds its slot indefinitely; there is
//! no timeout at this layer.

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::{
  Error, Result,
  ledger::Ledger,
  notify::{Attachment, Message, Notifier},
  retry::{Exhausted, exponential_backoff, retry},
};

const BODY_TEXT: &str =
  "Attached is the ledger of form submissions received so far today.";

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
  /// Maximum sends in flight at once.
  pub max_concurrent:  usize,
  /// Attempts per send, including the first.
  pub max_attempts:    u32,
  /// Delay after the first failed attempt; doubles for each further one.
  pub backoff_base_ms: u64,
  pub from:            String,
  pub to:              String,
}

impl Default for DispatchConfig {
  fn default() -> Self {
    Self {
      max_concurrent:  2,
      max_attempts:    3,
      backoff_base_ms: 1000,
      from:            "intake@localhost".to_string(),
      to:              "operator@localhost".to_string(),
    }
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
  Delivered { attempts: u32 },
  /// No ledger exists for the date; nothing was sent.
  NoFile,
  Failed { error: String, attempts: u32 },
}

impl DispatchOutcome {
  pub fn is_delivered(&self) -> bool { matches!(self, Self::Delivered { .. }) }
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

pub struct Dispatcher<L, N> {
  ledger:   Arc<L>,
  notifier: Arc<N>,
  gate:     Semaphore,
  config:   DispatchConfig,
}

impl<L, N> Dispatcher<L, N>
where
  L: Ledger,
  N: Notifier,
{
  pub fn new(ledger: Arc<L>, notifier: Arc<N>, config: DispatchConfig) -> Self {
    Self {
      ledger,
      notifier,
      gate: Semaphore::new(config.max_concurrent.max(1)),
      config,
    }
  }

  pub fn config(&self) -> &DispatchConfig { &self.config }

  /// Number of sends currently holding a slot.
  pub fn in_flight(&self) -> usize {
    self.config.max_concurrent.max(1) - self.gate.available_permits()
  }

  /// Send the ledger for `date` to the configured recipient.
  ///
  /// Ledger lookup failures are reported as [`DispatchOutcome::Failed`]
  /// without contacting the notifier.
  pub async fn dispatch_ledger(&self, date: NaiveDate) -> DispatchOutcome {
    match self.ledger.exists(date).await {
      Ok(true) => {}
      Ok(false) => {
        tracing::info!(%date, "no ledger to dispatch");
        return DispatchOutcome::NoFile;
      }
      Err(e) => {
        tracing::error!(%date, error = %e, "could not check for ledger");
        return DispatchOutcome::Failed {
          error:    e.to_string(),
          attempts: 0,
        };
      }
    }

    let message = self.ledger_message(date);
    match self.send(&message).await {
      Ok(attempts) => {
        tracing::info!(%date, attempts, to = %message.to, "ledger delivered");
        DispatchOutcome::Delivered { attempts }
      }
      Err(Exhausted {
        last_error,
        attempts,
      }) => {
        tracing::error!(%date, attempts, error = %last_error, "ledger delivery failed");
        DispatchOutcome::Failed {
          error: last_error.to_string(),
          attempts,
        }
      }
    }
  }

  /// Admit `message` through the gate and deliver it with retries.
  ///
  /// Returns the number of attempts the successful delivery took. The slot
  /// is released when this returns, whatever the outcome.
  pub async fn send(
    &self,
    message: &Message,
  ) -> Result<u32, Exhausted<Error>> {
    let _permit = self.gate.acquire().await.map_err(|_| Exhausted {
      last_error: Error::Delivery("admission gate closed".to_string()),
      attempts:   0,
    })?;

    let backoff =
      exponential_backoff(Duration::from_millis(self.config.backoff_base_ms));
    retry(self.config.max_attempts, backoff, move |_| async move {
      self
        .notifier
        .send(message)
        .await
        .map_err(|e| Error::Delivery(e.to_string()))
    })
    .await
    .map(|done| done.attempts)
  }

  fn ledger_message(&self, date: NaiveDate) -> Message {
    let path = self.ledger.path_for(date);
    let filename = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| format!("{date}"));
    Message {
      from:        self.config.from.clone(),
      to:          self.config.to.clone(),
      subject:     format!("Form submissions for {date}"),
      body_text:   BODY_TEXT.to_string(),
      attachments: vec![Attachment { filename, path }],
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
      Mutex,
      atomic::{AtomicU32, AtomicUsize, Ordering},
    },
  };

  use tokio::time::Instant;

  use super::*;
  use crate::{ledger::RepairReport, record::Record};

  // ── Test doubles ─────────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("{0}")]
  struct FakeError(String);

  /// A ledger that only knows which dates "exist".
  #[derive(Default)]
  struct FakeLedger {
    dates: Mutex<HashSet<NaiveDate>>,
  }

  impl FakeLedger {
    fn with_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
      Self {
        dates: Mutex::new(dates.into_iter().collect()),
      }
    }
  }

  impl Ledger for FakeLedger {
    type Error = FakeError;

    fn path_for(&self, date: NaiveDate) -> PathBuf {
      PathBuf::from(format!("/ledgers/{date}.csv"))
    }

    async fn append(&self, date: NaiveDate, _: Record) -> Result<PathBuf, FakeError> {
      self.dates.lock().unwrap().insert(date);
      Ok(self.path_for(date))
    }

    async fn exists(&self, date: NaiveDate) -> Result<bool, FakeError> {
      Ok(self.dates.lock().unwrap().contains(&date))
    }

    async fn repair(&self, _: &Path) -> Result<bool, FakeError> { Ok(false) }

    async fn repair_all(&self) -> Result<RepairReport, FakeError> {
      Ok(RepairReport::default())
    }
  }

  /// Fails the first `failures` sends, then succeeds.
  struct FlakyNotifier {
    failures: u32,
    calls:    AtomicU32,
  }

  impl Notifier for FlakyNotifier {
    type Error = FakeError;

    async fn send(&self, _: &Message) -> Result<(), FakeError> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst);
      if n < self.failures {
        Err(FakeError(format!("smtp refused #{n}")))
      } else {
        Ok(())
      }
    }
  }

  /// Blocks every send until the test hands out a release permit.
  struct GatedNotifier {
    entered:   Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak:      AtomicUsize,
    release:   Semaphore,
  }

  impl GatedNotifier {
    fn new() -> Self {
      Self {
        entered:   Mutex::new(Vec::new()),
        in_flight: AtomicUsize::new(0),
        peak:      AtomicUsize::new(0),
        release:   Semaphore::new(0),
      }
    }
  }

  impl Notifier for GatedNotifier {
    type Error = FakeError;

    async fn send(&self, message: &Message) -> Result<(), FakeError> {
      self.entered.lock().unwrap().push(message.subject.clone());
      let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
      self.peak.fetch_max(now, Ordering::SeqCst);
      self
        .release
        .acquire()
        .await
        .map_err(|e| FakeError(e.to_string()))?
        .forget();
      self.in_flight.fetch_sub(1, Ordering::SeqCst);
      Ok(())
    }
  }

  fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2026, 7, d).unwrap() }

  fn config(max_attempts: u32) -> DispatchConfig {
    DispatchConfig {
      max_attempts,
      ..DispatchConfig::default()
    }
  }

  // ── Tests ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_ledger_reports_no_file_without_sending() {
    let notifier = Arc::new(FlakyNotifier {
      failures: 0,
      calls:    AtomicU32::new(0),
    });
    let dispatcher =
      Dispatcher::new(Arc::new(FakeLedger::default()), notifier.clone(), config(3));

    assert_eq!(dispatcher.dispatch_ledger(day(1)).await, DispatchOutcome::NoFile);
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn message_names_the_date_and_attaches_the_file() {
    let dispatcher = Dispatcher::new(
      Arc::new(FakeLedger::default()),
      Arc::new(GatedNotifier::new()),
      DispatchConfig::default(),
    );
    let msg = dispatcher.ledger_message(day(9));
    assert_eq!(msg.subject, "Form submissions for 2026-07-09");
    assert_eq!(msg.attachments.len(), 1);
    assert_eq!(msg.attachments[0].filename, "2026-07-09.csv");
    assert_eq!(msg.to, "operator@localhost");
  }

  #[tokio::test(start_paused = true)]
  async fn two_failures_then_success_is_delivered_after_backoff() {
    let notifier = Arc::new(FlakyNotifier {
      failures: 2,
      calls:    AtomicU32::new(0),
    });
    let ledger = Arc::new(FakeLedger::with_dates([day(2)]));
    let dispatcher = Dispatcher::new(ledger, notifier.clone(), config(3));

    let started = Instant::now();
    let outcome = dispatcher.dispatch_ledger(day(2)).await;

    assert_eq!(outcome, DispatchOutcome::Delivered { attempts: 3 });
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_millis(1000 + 2000));
    assert_eq!(dispatcher.in_flight(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn exhausted_retries_report_last_error_and_release_slot() {
    let notifier = Arc::new(FlakyNotifier {
      failures: u32::MAX,
      calls:    AtomicU32::new(0),
    });
    let ledger = Arc::new(FakeLedger::with_dates([day(3)]));
    let dispatcher = Dispatcher::new(ledger, notifier, config(3));

    let outcome = dispatcher.dispatch_ledger(day(3)).await;
    assert_eq!(outcome, DispatchOutcome::Failed {
      error:    "delivery failed: smtp refused #2".to_string(),
      attempts: 3,
    });
    assert_eq!(dispatcher.in_flight(), 0);
  }

  #[tokio::test]
  async fn admission_is_capped_and_fifo() {
    let dates: Vec<NaiveDate> = (1..=5).map(day).collect();
    let ledger = Arc::new(FakeLedger::with_dates(dates.clone()));
    let notifier = Arc::new(GatedNotifier::new());
    let dispatcher = Arc::new(Dispatcher::new(
      ledger,
      notifier.clone(),
      DispatchConfig::default(),
    ));

    let mut handles = Vec::new();
    for date in dates {
      let dispatcher = dispatcher.clone();
      handles.push(tokio::spawn(async move { dispatcher.dispatch_ledger(date).await }));
      // Let the task run until it holds a slot or is queued at the gate.
      for _ in 0..4 {
        tokio::task::yield_now().await;
      }
    }

    assert_eq!(notifier.entered.lock().unwrap().len(), 2);
    assert_eq!(dispatcher.in_flight(), 2);

    for _ in 0..5 {
      notifier.release.add_permits(1);
      for _ in 0..8 {
        tokio::task::yield_now().await;
      }
      assert!(notifier.in_flight.load(Ordering::SeqCst) <= 2);
    }

    for handle in handles {
      assert!(handle.await.unwrap().is_delivered());
    }

    assert!(notifier.peak.load(Ordering::SeqCst) <= 2);
    let entered = notifier.entered.lock().unwrap().clone();
    let expected: Vec<String> = (1..=5)
      .map(|d| format!("Form submissions for {}", day(d)))
      .collect();
    assert_eq!(entered, expected);
  }
}
