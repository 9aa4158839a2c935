//! Retry policies with jittered exponential back-off, and the
//! cancellation-aware sleeper they consult.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use warden_proto::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sleeper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Waits out back-off delays between attempts. The sleep must return
/// early with an error when the owning client shuts down, so a caller
/// stuck retrying is unblocked by `close()`.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    /// Sleep for `d`, or return `Error::Closed` if interrupted.
    async fn sleep_for(&self, d: Duration) -> Result<()>;
}

/// Production sleeper: tokio clock, interrupted by the client's
/// shutdown token.
pub struct TokioSleeper {
    cancel: CancellationToken,
}

impl TokioSleeper {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep_for(&self, d: Duration) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(d) => Ok(()),
            _ = self.cancel.cancelled() => Err(Error::Closed),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decides whether a recoverable failure gets another attempt.
///
/// A policy that allows the retry performs its own back-off sleep via
/// `sleeper` before returning, and must answer `false` if the sleep was
/// interrupted — the caller is being shut down.
#[async_trait]
pub trait RetryPolicy: Send + Sync {
    async fn allow_retry(
        &self,
        retry_count: usize,
        elapsed: Duration,
        sleeper: &dyn RetrySleeper,
    ) -> bool;
}

/// Retry a fixed number of times with a constant delay between attempts.
#[derive(Debug, Clone)]
pub struct RetryNTimes {
    max_retries: usize,
    sleep_between: Duration,
}

impl RetryNTimes {
    pub fn new(max_retries: usize, sleep_between: Duration) -> Self {
        Self {
            max_retries,
            sleep_between,
        }
    }
}

#[async_trait]
impl RetryPolicy for RetryNTimes {
    async fn allow_retry(
        &self,
        retry_count: usize,
        _elapsed: Duration,
        sleeper: &dyn RetrySleeper,
    ) -> bool {
        retry_count < self.max_retries && sleeper.sleep_for(self.sleep_between).await.is_ok()
    }
}

/// Retry exactly once.
#[derive(Debug, Clone)]
pub struct RetryOneTime {
    inner: RetryNTimes,
}

impl RetryOneTime {
    pub fn new(sleep_between: Duration) -> Self {
        Self {
            inner: RetryNTimes::new(1, sleep_between),
        }
    }
}

#[async_trait]
impl RetryPolicy for RetryOneTime {
    async fn allow_retry(
        &self,
        retry_count: usize,
        elapsed: Duration,
        sleeper: &dyn RetrySleeper,
    ) -> bool {
        self.inner.allow_retry(retry_count, elapsed, sleeper).await
    }
}

/// Keep retrying until a total elapsed budget is exhausted.
#[derive(Debug, Clone)]
pub struct RetryUntilElapsed {
    max_elapsed: Duration,
    sleep_between: Duration,
}

impl RetryUntilElapsed {
    pub fn new(max_elapsed: Duration, sleep_between: Duration) -> Self {
        Self {
            max_elapsed,
            sleep_between,
        }
    }
}

#[async_trait]
impl RetryPolicy for RetryUntilElapsed {
    async fn allow_retry(
        &self,
        _retry_count: usize,
        elapsed: Duration,
        sleeper: &dyn RetrySleeper,
    ) -> bool {
        elapsed < self.max_elapsed && sleeper.sleep_for(self.sleep_between).await.is_ok()
    }
}

/// Never give up. Pair with a client whose `close()` interrupts the
/// sleeper, or callers will retry until the heat death of the universe.
#[derive(Debug, Clone)]
pub struct RetryForever {
    sleep_between: Duration,
}

impl RetryForever {
    pub fn new(sleep_between: Duration) -> Self {
        Self { sleep_between }
    }
}

#[async_trait]
impl RetryPolicy for RetryForever {
    async fn allow_retry(
        &self,
        _retry_count: usize,
        _elapsed: Duration,
        sleeper: &dyn RetrySleeper,
    ) -> bool {
        sleeper.sleep_for(self.sleep_between).await.is_ok()
    }
}

/// Jittered exponential back-off capped at `max_sleep`, giving up after
/// `max_retries`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetry {
    base_sleep: Duration,
    max_retries: usize,
    max_sleep: Duration,
}

impl ExponentialBackoffRetry {
    pub fn new(base_sleep: Duration, max_retries: usize, max_sleep: Duration) -> Self {
        Self {
            base_sleep,
            max_retries,
            max_sleep,
        }
    }

    /// Compute the delay for the given attempt number (0-indexed).
    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let base_ms = self.base_sleep.as_millis() as f64;
        let delay_ms = base_ms * 2f64.powi(attempt.min(30) as i32);
        let capped_ms = delay_ms.min(self.max_sleep.as_millis() as f64);

        // ~25% jitter to spread simultaneous retriers.
        let jitter = capped_ms * 0.25 * pseudo_random_fraction(attempt as u32);
        Duration::from_millis((capped_ms + jitter) as u64)
    }
}

impl Default for ExponentialBackoffRetry {
    fn default() -> Self {
        Self {
            base_sleep: Duration::from_millis(100),
            max_retries: 3,
            max_sleep: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl RetryPolicy for ExponentialBackoffRetry {
    async fn allow_retry(
        &self,
        retry_count: usize,
        _elapsed: Duration,
        sleeper: &dyn RetrySleeper,
    ) -> bool {
        retry_count < self.max_retries
            && sleeper
                .sleep_for(self.delay_for_attempt(retry_count))
                .await
                .is_ok()
    }
}

/// Cheap deterministic "random" fraction [0, 1) based on attempt number.
/// Not cryptographically secure — just enough to spread retry storms.
fn pseudo_random_fraction(attempt: u32) -> f64 {
    let hash = attempt.wrapping_mul(2654435761); // Knuth multiplicative hash
    (hash as f64) / (u32::MAX as f64)
}
