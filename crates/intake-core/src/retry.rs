//! Retry an async operation with a backoff between failed attempts.

use std::{fmt::Display, future::Future, time::Duration};

/// The value of a successful attempt and how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
  pub value:    T,
  pub attempts: u32,
}

/// Every attempt failed; carries the last error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted<E> {
  pub last_error: E,
  pub attempts:   u32,
}

/// `base * 2^attempt`, where `attempt` is the 0-based index of the attempt
/// that just failed: 1s, 2s, 4s, … for a one-second base.
pub fn exponential_backoff(base: Duration) -> impl Fn(u32) -> Duration {
  move |attempt| {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
  }
}

/// Run `operation` up to `max_attempts` times (at least once).
///
/// After a failed attempt `n`, sleeps `backoff(n)` if another attempt
/// remains. The first success short-circuits.
pub async fn retry<T, E, F, Fut, B>(
  max_attempts: u32,
  backoff: B,
  mut operation: F,
) -> Result<Retried<T>, Exhausted<E>>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
  B: Fn(u32) -> Duration,
  E: Display,
{
  let max_attempts = max_attempts.max(1);
  let mut attempt = 0;
  loop {
    match operation(attempt).await {
      Ok(value) => {
        return Ok(Retried {
          value,
          attempts: attempt + 1,
        });
      }
      Err(error) => {
        if attempt + 1 >= max_attempts {
          tracing::warn!(attempt = attempt + 1, %error, "final attempt failed");
          return Err(Exhausted {
            last_error: error,
            attempts:   attempt + 1,
          });
        }
        let delay = backoff(attempt);
        tracing::warn!(
          attempt = attempt + 1,
          retry_in_ms = delay.as_millis() as u64,
          %error,
          "attempt failed"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
    }
  }
}
