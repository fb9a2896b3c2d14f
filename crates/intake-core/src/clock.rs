//! Wall-clock abstraction used for OTP expiry, cooldowns and ledger stamps.

use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDate, TimeDelta, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  /// The local calendar date, which names the day's ledger.
  fn today(&self) -> NaiveDate { self.now().with_timezone(&Local).date_naive() }
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      now: Mutex::new(start),
    }
  }

  pub fn advance(&self, by: TimeDelta) {
    let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
    *now += by;
  }

  pub fn set(&self, to: DateTime<Utc>) {
    *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap_or_else(|e| e.into_inner())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn manual_clock_advances() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    clock.advance(TimeDelta::seconds(90));
    assert_eq!(clock.now(), start + TimeDelta::seconds(90));
  }
}
