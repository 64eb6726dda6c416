use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Retry discipline for a single pipeline stage.
///
/// Retries are stage-local: a successful retry of one stage never re-runs
/// another. Only errors classified transient by [`AppError::is_transient`]
/// are retried; everything else fails the stage on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
    /// Jitter applied on top of the computed backoff delay
    pub jitter: fn(Duration) -> Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            jitter: random_jitter,
        }
    }

    /// No-delay policy for tests
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            backoff_multiplier: 2.0,
            max_delay: Duration::ZERO,
            jitter: no_jitter,
        }
    }

    /// Backoff before attempt `attempt + 1`, capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = Duration::from_millis(backoff as u64).min(self.max_delay);
        (self.jitter)(capped).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            jitter: random_jitter,
        }
    }
}

/// Perturbs a delay by up to ±25% to avoid synchronized retries
fn random_jitter(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let millis = delay.as_millis() as f64;
    let factor = rand::thread_rng().gen_range(0.75..1.25);
    Duration::from_millis((millis * factor) as u64)
}

#[cfg(test)]
fn no_jitter(delay: Duration) -> Duration {
    delay
}

/// Runs one stage operation under the given retry policy.
///
/// `stage` names the operation in logs. Transient errors are retried with
/// backoff until `max_attempts` is reached; the last error is returned.
pub async fn run_retryable<T, F, Fut>(policy: &RetryPolicy, stage: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    stage = stage,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Stage attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(
                    stage = stage,
                    attempts = attempt + 1,
                    error = %e,
                    "Stage failed"
                );
                return Err(e);
            }
        }
    }
}
