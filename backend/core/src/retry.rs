//! Bounded retry with exponential backoff for external LLM calls.
//!
//! The default policy makes a single attempt. Retries only ever wrap one
//! external call, so nothing is committed to shared state until the call
//! finally succeeds.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::HeatlensError;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay between retries in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplier for each subsequent wait (exponential factor).
    pub backoff_factor: f64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Add ±25% jitter to the computed delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 500,
            backoff_factor: 2.0,
            max_delay_ms: 10_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self::default()
    }

    /// Wait before retry number `retry` (the first retry is 1): the base
    /// delay scaled by `backoff_factor` per earlier retry, capped at
    /// `max_delay_ms`, then jittered.
    pub fn backoff(&self, retry: u32) -> Duration {
        if self.base_delay_ms == 0 {
            return Duration::ZERO;
        }
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.base_delay_ms as f64 * self.backoff_factor.max(1.0).powi(exponent);
        let capped = scaled.min(self.max_delay_ms as f64).max(0.0) as u64;
        if !self.jitter {
            return Duration::from_millis(capped);
        }
        let spread = capped / 4;
        let shift = rand::thread_rng().gen_range(0..=spread * 2);
        Duration::from_millis(capped - spread + shift)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy is exhausted. The last error is returned on exhaustion.
pub async fn retry_async<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, HeatlensError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HeatlensError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut retry = 0;
    loop {
        retry += 1;
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retryable() || retry >= attempts {
            return Err(err);
        }
        let delay = policy.backoff(retry);
        warn!(
            call = label,
            attempt = retry,
            max = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "External call failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = RetryPolicy {
            max_delay_ms: 3_000,
            jitter: false,
            ..Default::default()
        };
        let waits: Vec<u128> = (1..=5).map(|r| policy.backoff(r).as_millis()).collect();
        assert_eq!(waits, vec![500, 1_000, 2_000, 3_000, 3_000]);
        assert_eq!(policy.backoff(u32::MAX).as_millis(), 3_000);
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let wait = policy.backoff(2).as_millis();
            assert!((750..=1_250).contains(&wait), "{wait}");
        }
    }

    #[tokio::test]
    async fn default_policy_calls_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_async(&RetryPolicy::no_retry(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(HeatlensError::external("mock", "503")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_external_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_async(&fast(3), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(HeatlensError::external("mock", "503"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_async(&fast(2), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(HeatlensError::external("mock", "down")) }
        })
        .await;
        assert!(matches!(result, Err(HeatlensError::ExternalService { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_persistence_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_async(&fast(5), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(HeatlensError::persistence("/x", "read-only")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
