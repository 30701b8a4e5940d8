//! Bounded retry with exponential backoff for page actions.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::PageError;
use crate::metrics;

/// The `[retry]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Add up to 10% random jitter to each delay.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }

    fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0.0..=0.1) * base.as_millis() as f64;
        base + Duration::from_millis(extra as u64)
    }
}

/// Run `action`, retrying navigation errors according to `policy`.
///
/// Non-retryable errors and the last navigation error are returned as-is.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut action: F,
) -> Result<T, PageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PageError>>,
{
    let mut attempt = 0;
    loop {
        match action().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Page action failed, retrying: {}",
                    e
                );
                metrics::PAGE_RETRIES.with_label_values(&[operation]).inc();
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter: false,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay_ms: 100,
            max_delay_ms: 500,
            jitter: false,
        };
        assert_eq!(policy.base_delay(0), Duration::from_millis(100));
        assert_eq!(policy.base_delay(1), Duration::from_millis(200));
        assert_eq!(policy.base_delay(2), Duration::from_millis(400));
        assert_eq!(policy.base_delay(3), Duration::from_millis(500));
        assert_eq!(policy.base_delay(40), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_bounded() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            jitter: true,
        };
        for _ in 0..20 {
            let delay = policy.delay(0);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1100));
        }
    }

    #[tokio::test]
    async fn test_retries_navigation_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_policy(3), "search", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(PageError::Navigation("timeout".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_policy(2), "search", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PageError::Navigation("timeout".into()))
        })
        .await;

        assert!(matches!(result, Err(PageError::Navigation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_element_not_found_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_policy(5), "submit_field", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PageError::ElementNotFound("#phone".into()))
        })
        .await;

        assert!(matches!(result, Err(PageError::ElementNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
