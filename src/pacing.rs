//! Pacing and retry/backoff control.
//!
//! Two pacing mechanisms are used by the pipeline:
//!
//! - [`Pacer`] enforces a fixed inter-item delay per source after each item
//!   is fully processed (success or failure).
//! - [`retry`] executes an operation up to `max_attempts` times, waiting
//!   `base_delay * multiplier^(attempt-1)` between attempts, but only for
//!   failures classified as transient. Terminal failures abort immediately.
//!
//! All sleeps go through the [`Sleeper`] trait so tests can run without
//! real delays.

use crate::error::{Result, SkrybaError};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

/// Upper bound on a single computed backoff delay, guarding against
/// overflow from extreme multiplier/attempt combinations.
const MAX_BACKOFF: Duration = Duration::from_secs(300);

impl BackoffPolicy {
    /// Delay to wait after the given 1-based failed attempt.
    ///
    /// The result is always a valid duration in `0..=MAX_BACKOFF`, even for
    /// a policy holding a negative or non-finite multiplier.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let secs = self.base_delay.as_secs_f64() * factor;
        if secs.is_finite() {
            Duration::from_secs_f64(secs.clamp(0.0, MAX_BACKOFF.as_secs_f64()))
        } else {
            MAX_BACKOFF
        }
    }
}

/// Injectable sleep abstraction.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Execute `operation` with exponential backoff on transient failures.
///
/// Terminal failures (unavailable/private signals, parse errors) are
/// returned after exactly one attempt.
pub async fn retry<T, F, Fut>(
    policy: &BackoffPolicy,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    error = %e,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, retrying"
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fixed-delay pacing for one source.
pub struct Pacer {
    delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl Pacer {
    pub fn new(delay: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { delay, sleeper }
    }

    /// Block for the source's configured inter-item delay.
    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            self.sleeper.sleep(self.delay).await;
        }
    }
}
