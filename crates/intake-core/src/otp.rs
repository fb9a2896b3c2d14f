//! One-time passcode issuance and verification.
//!
//! State is a process-local table keyed by identifier and is deliberately not
//! persisted: a restart discards every outstanding code. Records are checked
//! for expiry lazily, whenever they are touched.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, TimeDelta, Utc};
use rand::{Rng as _, rngs::OsRng};
use serde::Deserialize;

use crate::{
  Error, Result,
  clock::{Clock, SystemClock},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Tunables for [`OtpVerifier`]. Every field has a serde default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
  /// Seconds after issuance at which a code stops being accepted.
  pub expiry_secs:   u64,
  /// Seconds that must pass before a new code may be issued.
  pub cooldown_secs: u64,
  /// Mismatches allowed before the record is discarded.
  pub max_attempts:  u32,
  /// Number of digits in a code.
  pub code_length:   u32,
}

impl Default for OtpConfig {
  fn default() -> Self {
    Self {
      expiry_secs:   600,
      cooldown_secs: 120,
      max_attempts:  3,
      code_length:   6,
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// The live state for one identifier.
#[derive(Debug, Clone)]
pub struct OtpRecord {
  pub code:          String,
  pub issued_at:     DateTime<Utc>,
  pub attempt_count: u32,
  pub verified:      bool,
}

/// A freshly minted code. The caller is responsible for delivering it.
#[derive(Debug, Clone)]
pub struct Issued {
  pub code:       String,
  pub expires_at: DateTime<Utc>,
}

// ─── Verifier ────────────────────────────────────────────────────────────────

pub struct OtpVerifier {
  config:  OtpConfig,
  clock:   Arc<dyn Clock>,
  records: Mutex<HashMap<String, OtpRecord>>,
}

impl OtpVerifier {
  pub fn new(config: OtpConfig, clock: Arc<dyn Clock>) -> Self {
    Self {
      config,
      clock,
      records: Mutex::new(HashMap::new()),
    }
  }

  pub fn with_system_clock(config: OtpConfig) -> Self {
    Self::new(config, Arc::new(SystemClock))
  }

  pub fn config(&self) -> &OtpConfig { &self.config }

  /// Mint a new code for `identifier`, replacing any previous record.
  ///
  /// Fails with [`Error::Cooldown`] while a live record younger than the
  /// cooldown exists. A new code resets the attempt counter and discards any
  /// verification earned with the previous code.
  pub fn issue(&self, identifier: &str) -> Result<Issued> {
    validate_identifier(identifier)?;
    let now = self.clock.now();
    let mut records = self.lock();

    if let Some(existing) = records.get(identifier)
      && self.is_live(existing, now)
    {
      let cooldown = TimeDelta::seconds(secs_i64(self.config.cooldown_secs));
      let elapsed = now - existing.issued_at;
      if elapsed < cooldown {
        return Err(Error::Cooldown {
          remaining_secs: ceil_secs(cooldown - elapsed),
        });
      }
    }

    let code = self.generate_code();
    records.insert(identifier.to_owned(), OtpRecord {
      code:          code.clone(),
      issued_at:     now,
      attempt_count: 0,
      verified:      false,
    });

    Ok(Issued {
      code,
      expires_at: now + self.expiry(),
    })
  }

  /// Check `submitted` against the live code for `identifier`.
  ///
  /// A match marks the record verified and keeps it for [`consume`]. A
  /// mismatch counts an attempt; the attempt that reaches the limit discards
  /// the record and reports [`Error::TooManyAttempts`].
  ///
  /// [`consume`]: Self::consume
  pub fn verify(&self, identifier: &str, submitted: &str) -> Result<()> {
    validate_identifier(identifier)?;
    self.validate_code(submitted)?;
    let now = self.clock.now();
    let mut records = self.lock();

    let Some(record) = records.get_mut(identifier) else {
      return Err(Error::NotFound);
    };

    if now - record.issued_at > self.expiry() {
      records.remove(identifier);
      return Err(Error::NotFound);
    }

    // A mismatch that reaches the limit already discards the record, so
    // this only fires when `max_attempts` is zero.
    if record.attempt_count >= self.config.max_attempts {
      records.remove(identifier);
      return Err(Error::TooManyAttempts);
    }

    if record.code != submitted {
      record.attempt_count += 1;
      let attempts_remaining =
        self.config.max_attempts.saturating_sub(record.attempt_count);
      if attempts_remaining == 0 {
        records.remove(identifier);
        return Err(Error::TooManyAttempts);
      }
      return Err(Error::Mismatch { attempts_remaining });
    }

    record.verified = true;
    Ok(())
  }

  /// Remove the record for `identifier`, returning whether it was live and
  /// verified. Used once per accepted submission so a verification cannot be
  /// replayed.
  pub fn consume(&self, identifier: &str) -> bool {
    let now = self.clock.now();
    let removed = self.lock().remove(identifier);
    removed.is_some_and(|r| r.verified && now - r.issued_at <= self.expiry())
  }

  /// Withdraw the record for `identifier` if it still holds `code`.
  ///
  /// Used when delivery of a freshly issued code fails.
  pub fn revoke(&self, identifier: &str, code: &str) {
    let mut records = self.lock();
    if records.get(identifier).is_some_and(|r| r.code == code) {
      records.remove(identifier);
    }
  }

  /// Number of records currently held, live or not yet swept.
  pub fn len(&self) -> usize { self.lock().len() }

  pub fn is_empty(&self) -> bool { self.lock().is_empty() }

  // ── Internals ───────────────────────────────────────────────────────────

  fn lock(&self) -> MutexGuard<'_, HashMap<String, OtpRecord>> {
    self.records.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn expiry(&self) -> TimeDelta {
    TimeDelta::seconds(secs_i64(self.config.expiry_secs))
  }

  fn is_live(&self, record: &OtpRecord, now: DateTime<Utc>) -> bool {
    now - record.issued_at <= self.expiry()
      && record.attempt_count < self.config.max_attempts
  }

  fn code_length(&self) -> u32 { self.config.code_length.clamp(1, 18) }

  fn generate_code(&self) -> String {
    let len = self.code_length();
    let low = if len == 1 { 0 } else { 10u64.pow(len - 1) };
    let high = 10u64.pow(len) - 1;
    OsRng.gen_range(low..=high).to_string()
  }

  fn validate_code(&self, code: &str) -> Result<()> {
    let expected = self.code_length();
    if code.len() != expected as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
      return Err(Error::InvalidCode { expected });
    }
    Ok(())
  }
}

/// Identifiers are 10-digit phone numbers.
pub fn validate_identifier(identifier: &str) -> Result<()> {
  if identifier.len() == 10 && identifier.bytes().all(|b| b.is_ascii_digit()) {
    Ok(())
  } else {
    Err(Error::InvalidIdentifier(identifier.to_owned()))
  }
}

fn secs_i64(secs: u64) -> i64 { i64::try_from(secs).unwrap_or(i64::MAX / 1000) }

/// Whole seconds, rounded up, so a caller never retries too early.
fn ceil_secs(delta: TimeDelta) -> u64 {
  let millis = delta.num_milliseconds().max(0) as u64;
  millis.div_ceil(1000)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::clock::ManualClock;

  const PHONE: &str = "9999999999";

  fn verifier() -> (Arc<ManualClock>, OtpVerifier) {
    let clock = Arc::new(ManualClock::new(
      Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap(),
    ));
    let otp = OtpVerifier::new(OtpConfig::default(), clock.clone());
    (clock, otp)
  }

  fn wrong_code(code: &str) -> String {
    let first = if code.starts_with('1') { '2' } else { '1' };
    std::iter::once(first).chain(code.chars().skip(1)).collect()
  }

  #[test]
  fn rejects_malformed_identifiers() {
    let (_, otp) = verifier();
    for bad in ["", "123", "99999999999", "99999x9999", "+919999999"] {
      assert!(matches!(otp.issue(bad), Err(Error::InvalidIdentifier(_))), "{bad}");
    }
    assert!(otp.is_empty());
  }

  #[test]
  fn codes_have_configured_length_without_padding() {
    let (clock, otp) = verifier();
    for _ in 0..50 {
      let issued = otp.issue(PHONE).unwrap();
      assert_eq!(issued.code.len(), 6);
      assert!(!issued.code.starts_with('0'));
      assert!(issued.code.parse::<u32>().is_ok());
      clock.advance(TimeDelta::seconds(121));
    }
  }

  #[test]
  fn cooldown_remaining_strictly_decreases() {
    let (clock, otp) = verifier();
    otp.issue(PHONE).unwrap();

    let mut last = u64::MAX;
    for _ in 0..5 {
      clock.advance(TimeDelta::seconds(10));
      match otp.issue(PHONE) {
        Err(Error::Cooldown { remaining_secs }) => {
          assert!(remaining_secs < last, "{remaining_secs} !< {last}");
          last = remaining_secs;
        }
        other => panic!("expected cooldown, got {other:?}"),
      }
    }
    assert_eq!(last, 70);
  }

  #[test]
  fn reissue_after_cooldown_replaces_code() {
    let (clock, otp) = verifier();
    let first = otp.issue(PHONE).unwrap();
    clock.advance(TimeDelta::seconds(120));
    let second = otp.issue(PHONE).unwrap();
    assert_eq!(otp.len(), 1);
    if first.code != second.code {
      assert!(matches!(
        otp.verify(PHONE, &first.code),
        Err(Error::Mismatch { .. })
      ));
    }
    otp.verify(PHONE, &second.code).unwrap();
  }

  #[test]
  fn correct_code_verifies_and_is_consumed_once() {
    let (_, otp) = verifier();
    let issued = otp.issue(PHONE).unwrap();
    otp.verify(PHONE, &issued.code).unwrap();
    assert!(otp.consume(PHONE));
    assert!(!otp.consume(PHONE));
    assert!(matches!(otp.verify(PHONE, &issued.code), Err(Error::NotFound)));
  }

  #[test]
  fn new_code_discards_previous_verification() {
    let (clock, otp) = verifier();
    let issued = otp.issue(PHONE).unwrap();
    otp.verify(PHONE, &issued.code).unwrap();
    clock.advance(TimeDelta::seconds(121));
    otp.issue(PHONE).unwrap();
    assert!(!otp.consume(PHONE));
  }

  #[test]
  fn expired_code_is_not_found() {
    let (clock, otp) = verifier();
    let issued = otp.issue(PHONE).unwrap();
    clock.advance(TimeDelta::seconds(601));
    assert!(matches!(otp.verify(PHONE, &issued.code), Err(Error::NotFound)));
    assert!(otp.is_empty());
  }

  #[test]
  fn verified_but_expired_record_does_not_consume() {
    let (clock, otp) = verifier();
    let issued = otp.issue(PHONE).unwrap();
    otp.verify(PHONE, &issued.code).unwrap();
    clock.advance(TimeDelta::seconds(601));
    assert!(!otp.consume(PHONE));
  }

  #[test]
  fn exhausted_attempts_remove_record() {
    let (_, otp) = verifier();
    let issued = otp.issue(PHONE).unwrap();
    let wrong = wrong_code(&issued.code);

    assert!(matches!(
      otp.verify(PHONE, &wrong),
      Err(Error::Mismatch { attempts_remaining: 2 })
    ));
    assert!(matches!(
      otp.verify(PHONE, &wrong),
      Err(Error::Mismatch { attempts_remaining: 1 })
    ));
    assert!(matches!(otp.verify(PHONE, &wrong), Err(Error::TooManyAttempts)));
    assert!(matches!(otp.verify(PHONE, &issued.code), Err(Error::NotFound)));
  }

  #[test]
  fn exhausted_record_does_not_block_reissue() {
    let (_, otp) = verifier();
    let issued = otp.issue(PHONE).unwrap();
    let wrong = wrong_code(&issued.code);
    for _ in 0..3 {
      let _ = otp.verify(PHONE, &wrong);
    }
    assert!(otp.issue(PHONE).is_ok());
  }

  #[test]
  fn malformed_code_does_not_count_as_attempt() {
    let (_, otp) = verifier();
    let issued = otp.issue(PHONE).unwrap();
    for _ in 0..5 {
      assert!(matches!(
        otp.verify(PHONE, "12ab56"),
        Err(Error::InvalidCode { expected: 6 })
      ));
    }
    otp.verify(PHONE, &issued.code).unwrap();
  }

  #[test]
  fn revoke_only_removes_matching_code() {
    let (_, otp) = verifier();
    let issued = otp.issue(PHONE).unwrap();
    otp.revoke(PHONE, &wrong_code(&issued.code));
    assert_eq!(otp.len(), 1);
    otp.revoke(PHONE, &issued.code);
    assert!(otp.is_empty());
  }

  #[test]
  fn zero_attempt_budget_refuses_even_the_right_code() {
    let clock = Arc::new(ManualClock::new(
      Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap(),
    ));
    let otp = OtpVerifier::new(
      OtpConfig {
        max_attempts: 0,
        ..OtpConfig::default()
      },
      clock,
    );
    let issued = otp.issue(PHONE).unwrap();
    assert!(matches!(otp.verify(PHONE, &issued.code), Err(Error::TooManyAttempts)));
    assert!(matches!(otp.verify(PHONE, &issued.code), Err(Error::NotFound)));
    assert!(!otp.consume(PHONE));
  }
}
