use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::storage::StorageError;

use super::AppError;

/// How many times to try reaching the store at startup, and how long to wait
/// between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Try once, without waiting.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}

/// Run a storage initialization step until it succeeds or the policy is
/// exhausted. Only for process startup; request handling never retries.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut attempt_fn: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut attempt = 1;
    loop {
        match attempt_fn().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(attempt, "Storage became available");
                }
                return Ok(value);
            }
            Err(err) if attempt >= policy.max_attempts => {
                warn!(attempt, error = %err, "Giving up on storage");
                return Err(AppError::StorageUnavailable {
                    attempts: attempt,
                    source: err,
                });
            }
            Err(err) => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "Storage not ready, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
