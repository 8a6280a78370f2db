use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::llm_client::ProviderError;

/// Bounded retry for provider calls: per-attempt timeout plus exponential backoff
/// (base, 2×base, 4×base, ...) between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Runs `call` until it succeeds, fails with a non-retryable error, or the
/// attempts run out. Exhaustion is reported as `RetriesExhausted` wrapping the last error.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error: Option<ProviderError> = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = policy.delay_before(attempt);
            warn!(
                label,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error.as_ref().map(|e| e.to_string()).unwrap_or_default(),
                "Provider call failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }

        let error = match tokio::time::timeout(policy.attempt_timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if !e.is_retryable() => return Err(e),
            Ok(Err(e)) => e,
            Err(_) => ProviderError::Timeout {
                seconds: policy.attempt_timeout.as_secs(),
            },
        };
        last_error = Some(error);
    }

    Err(ProviderError::RetriesExhausted {
        attempts,
        source: Box::new(last_error.unwrap_or(ProviderError::EmptyContent)),
    })
}
