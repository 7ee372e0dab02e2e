//! Timeout-bounded invocation

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, ServiceError};

/// Run `operation` with a deadline.
///
/// On expiry the operation future is dropped, which aborts an in-flight
/// `reqwest` call, and a `ServiceError::Timeout` carrying `label` and the
/// deadline is returned. The timer is owned by `tokio::time::timeout` and is
/// released on every exit path.
pub async fn with_timeout<F, T>(label: &str, deadline: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(label = %label, timeout_ms = deadline.as_millis() as u64, "Deadline expired");
            Err(ServiceError::timeout(label, deadline))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_returns_result_before_deadline() {
        let result = with_timeout("fast", Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, ServiceError>(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_produces_labelled_timeout() {
        let result = with_timeout("slow call", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ServiceError>(())
        })
        .await;

        match result {
            Err(ServiceError::Timeout {
                label,
                timeout_ms,
                attempts,
            }) => {
                assert_eq!(label, "slow call");
                assert_eq!(timeout_ms, 50);
                assert_eq!(attempts, 1);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_inner_error_passes_through() {
        let result: Result<()> = with_timeout("call", Duration::from_secs(1), async {
            Err(ServiceError::authentication("bad key"))
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "authentication");
    }
}
