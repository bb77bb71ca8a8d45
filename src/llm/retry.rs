//! Bounded retry with exponential backoff for provider calls.
//!
//! Only errors for which [`PipelineError::is_transient`] holds are retried.
//! Anything else surfaces after the first attempt.  Running out of attempts
//! on a transient error yields [`PipelineError::ProviderExhausted`].

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{PipelineError, ProviderResult};

/// Upper bound on the backoff exponent so large budgets cannot overflow.
const MAX_DOUBLINGS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after failed attempt number `attempt` (1-based):
    /// `base`, `2 * base`, `4 * base`, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(MAX_DOUBLINGS);
        self.base_delay.saturating_mul(1u32 << doublings)
    }

    /// Run `op` under this policy, sleeping on the tokio timer between
    /// attempts.  `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> ProviderResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        self.run_with(label, op, tokio::time::sleep).await
    }

    /// Like [`run`](Self::run) with a caller-supplied sleep.
    pub async fn run_with<T, F, Fut, S, SFut>(
        &self,
        label: &str,
        mut op: F,
        mut sleep: S,
    ) -> ProviderResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
        S: FnMut(Duration) -> SFut,
        SFut: Future<Output = ()>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        log::info!("retry: {label} succeeded on attempt {attempt}");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => {
                    log::warn!("retry: {label} failed permanently: {e}");
                    return Err(e);
                }
                Err(e) if attempt >= self.max_attempts => {
                    log::error!("retry: {label} exhausted {attempt} attempts: {e}");
                    return Err(PipelineError::ProviderExhausted {
                        provider: label.to_string(),
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "retry: {label} attempt {attempt}/{} failed ({e}); retrying in {delay:?}",
                        self.max_attempts
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
