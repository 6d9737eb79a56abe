//! Bounded retry helper.
//!
//! Pod status transitions are eventually consistent after a disruption, so
//! most cluster-facing checks are wrapped in a fixed-attempt retry loop.
//! The loop only re-runs errors classified retryable by
//! [`Error::is_retryable`]; structural violations surface immediately.
//!
//! A policy whose worst-case runtime exceeds its ceiling is refused up
//! front, before the first attempt runs.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A fixed-attempt, fixed-delay retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub attempts: u32,
    /// Sleep between attempts.
    pub delay: Duration,
    /// Upper bound on the worst-case total runtime of the loop itself
    /// (attempt execution time excluded).
    pub ceiling: Duration,
}

impl RetryPolicy {
    /// A policy with `attempts` tries spaced `delay_secs` apart.
    pub const fn fixed(attempts: u32, delay_secs: u64) -> Self {
        Self {
            attempts,
            delay: Duration::from_secs(delay_secs),
            ceiling: Duration::from_secs(3600),
        }
    }

    /// Worst-case time spent sleeping between attempts.
    pub fn worst_case(&self) -> Duration {
        self.delay * self.attempts.saturating_sub(1)
    }
}

/// Pod enumeration after a disruption: 20 tries, 10s apart.
pub const POD_ENUMERATION: RetryPolicy = RetryPolicy::fixed(20, 10);

/// Pause checkers: 10 tries, 10s apart.
pub const PAUSE_CHECK: RetryPolicy = RetryPolicy::fixed(10, 10);

/// Ceph accessibility probe: 15 tries, 5s apart. Even invoking the tools
/// pod can transiently fail during an active network partition.
pub const ACCESSIBILITY: RetryPolicy = RetryPolicy::fixed(15, 5);

/// Workload recovery scale-cycle: 5 tries, 10s apart. A single cycle may
/// not be enough if the underlying CSI race has not yet cleared.
pub const RECOVERY: RetryPolicy = RetryPolicy::fixed(5, 10);

/// Run `op` under `policy`, sleeping between attempts.
///
/// Returns the first success, or the last error once attempts are
/// exhausted or a non-retryable error is hit.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if policy.worst_case() > policy.ceiling {
        return Err(Error::RetryBudget {
            op: op_name.to_string(),
            worst_case: policy.worst_case(),
            ceiling: policy.ceiling,
        });
    }

    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.attempts && e.is_retryable() => {
                warn!(
                    op = op_name,
                    attempt,
                    max_attempts = policy.attempts,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                debug!(op = op_name, attempt, "Giving up");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let policy = RetryPolicy::fixed(3, 0);
        let result = retry(&policy, "noop", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let policy = RetryPolicy::fixed(5, 0);
        let calls = AtomicU32::new(0);
        let result = retry(&policy, "flaky", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::CommandFailed {
                    command: "ceph -s".to_string(),
                    stderr: "connection reset".to_string(),
                })
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_rerun_structural_errors() {
        let policy = RetryPolicy::fixed(5, 0);
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(&policy, "validate", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::ConnectionScore("self-referential peer".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_refuses_oversized_budget() {
        let policy = RetryPolicy {
            attempts: 100,
            delay: Duration::from_secs(120),
            ceiling: Duration::from_secs(600),
        };
        let result: Result<()> = retry(&policy, "huge", || async { Ok(()) }).await;
        assert!(matches!(result, Err(Error::RetryBudget { .. })));
    }

    #[test]
    fn test_worst_case() {
        let policy = RetryPolicy::fixed(20, 10);
        assert_eq!(policy.worst_case(), Duration::from_secs(190));
    }
}
