//! Caller-configured retry with exponential backoff.
//!
//! The default policy makes exactly one attempt. Retries only apply to
//! errors where [`ProviderError::is_retryable`] holds.

use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::providers::ProviderError;

/// Retry policy for one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts after the first; 0 disables retry
    pub max_retries: usize,

    #[serde(with = "crate::config::human_duration")]
    pub min_delay: Duration,

    #[serde(with = "crate::config::human_duration")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Single attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }

    pub fn exponential(max_retries: usize, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            min_delay,
            max_delay,
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
    }

    /// Run `op` under this policy.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        if self.max_retries == 0 {
            return op().await;
        }

        op.retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(ProviderError::is_retryable)
            .notify(|err: &ProviderError, delay: Duration| {
                tracing::warn!(error = %err, delay_ms = delay.as_millis() as u64, "Retrying model call");
            })
            .await
    }
}
