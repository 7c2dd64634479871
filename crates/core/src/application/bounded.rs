// Bounded external calls: every repository/dispatch call carries a timeout

use crate::error::{AppError, Result};
use std::future::Future;
use std::time::Duration;

/// Await `fut`, failing with `AppError::Timeout` after `timeout`
pub async fn bounded<T, F>(timeout: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout {
            operation: operation.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
