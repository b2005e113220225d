//! Retry, backoff and timeout composition for remote calls
//!
//! One policy object is injected into every remote call site instead of each
//! site growing its own loop. Every wait is raced against the run's
//! cancellation token; a cancelled wait resolves as `ServiceError::Cancelled`.

use quarry_domain::ServiceError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Default per-attempt timeout (60 seconds)
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 60;

/// Default number of attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry policy for transient service errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (1 = no retries)
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles afterwards (milliseconds)
    pub base_delay_ms: u64,

    /// Upper bound of the random jitter added to each backoff (milliseconds)
    #[serde(default)]
    pub jitter_ms: u64,

    /// Timeout raced against each attempt (seconds)
    pub per_attempt_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 1_000,
            jitter_ms: 250,
            per_attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
        }
    }
}

impl RetryPolicy {
    /// A single attempt with the given timeout
    pub fn single_attempt(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            jitter_ms: 0,
            per_attempt_timeout_secs: timeout.as_secs().max(1),
        }
    }

    /// Set the maximum number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Per-attempt timeout as a Duration
    pub fn per_attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.per_attempt_timeout_secs)
    }

    /// Delay before attempt number `attempt` (1-based; attempt 1 has none)
    ///
    /// Exponential: base, 2×base, 4×base, … plus up to `jitter_ms` of jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(16);
        let base = self.base_delay_ms.saturating_mul(1u64 << exponent);
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            fastrand::u64(0..=self.jitter_ms)
        };
        Duration::from_millis(base.saturating_add(jitter))
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".to_string());
        }
        if self.per_attempt_timeout_secs == 0 {
            return Err("per_attempt_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Run `op` under this policy
    ///
    /// Transient errors (including per-attempt timeouts) are retried after
    /// backoff; fatal errors and cancellation return immediately. The token is
    /// checked before every attempt.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_llm::RetryPolicy;
    /// use quarry_domain::ServiceError;
    /// use tokio_util::sync::CancellationToken;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    ///
    /// # tokio_test::block_on(async {
    /// let policy = RetryPolicy { base_delay_ms: 1, jitter_ms: 0, ..RetryPolicy::default() };
    /// let counter = AtomicU32::new(0);
    /// let attempts = &counter;
    /// let result = policy
    ///     .run(&CancellationToken::new(), "example", || async move {
    ///         if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
    ///             Err(ServiceError::RateLimited)
    ///         } else {
    ///             Ok(7)
    ///         }
    ///     })
    ///     .await;
    /// assert_eq!(result, Ok(7));
    /// # });
    /// ```
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        label: &str,
        mut op: F,
    ) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(ServiceError::Cancelled);
            }

            match call_with_timeout(self.per_attempt_timeout(), cancel, op()).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < attempts => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        call = label,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure, retrying: {}",
                        error
                    );
                    cancellable_sleep(delay, cancel).await?;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Sleep for `duration` unless the token fires first
pub async fn cancellable_sleep(
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), ServiceError> {
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ServiceError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Race `call` against a timeout and the cancellation token
///
/// A timeout becomes `ServiceError::Timeout`; a fired token becomes
/// `ServiceError::Cancelled`.
pub async fn call_with_timeout<T, Fut>(
    timeout: Duration,
    cancel: &CancellationToken,
    call: Fut,
) -> Result<T, ServiceError>
where
    Fut: Future<Output = Result<T, ServiceError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ServiceError::Cancelled),
        outcome = tokio::time::timeout(timeout, call) => {
            outcome.unwrap_or(Err(ServiceError::Timeout(timeout)))
        }
    }
}
