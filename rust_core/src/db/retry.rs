//! Database retry logic for transient failures
//!
//! Used around connection setup and migrations, where the database may still
//! be starting. Query-level errors such as constraint violations are never
//! retried: those carry business meaning.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// SQLSTATE codes worth retrying: serialization failure, deadlock,
/// too many connections, admin shutdown, cannot connect now.
const RETRIABLE_SQLSTATES: &[&str] = &["40001", "40P01", "53300", "57P01", "57P03"];

/// Execute a database operation with exponential backoff on transient failures.
///
/// # Example
/// ```ignore
/// let pool = execute_with_retry(|| PgPool::connect(&url), 5).await?;
/// ```
pub async fn execute_with_retry<F, Fut, T>(f: F, max_attempts: u32) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    execute_with_retry_custom(f, max_attempts, 100, 5_000).await
}

/// Execute with retry and custom backoff configuration
pub async fn execute_with_retry_custom<F, Fut, T>(
    mut f: F,
    max_attempts: u32,
    base_backoff_ms: u64,
    max_backoff_ms: u64,
) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_attempts && is_retriable_error(&e) => {
                let backoff_ms = base_backoff_ms
                    .saturating_mul(2_u64.saturating_pow(attempt - 1))
                    .min(max_backoff_ms);
                warn!(
                    "Database operation failed (attempt {}/{}): {}. Retrying in {}ms",
                    attempt, max_attempts, e, backoff_ms
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Check if a database error is likely transient
pub fn is_retriable_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| RETRIABLE_SQLSTATES.iter().any(|c| *c == code))
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn io_error() -> sqlx::Error {
        sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))
    }

    #[test]
    fn test_is_retriable_error() {
        assert!(is_retriable_error(&io_error()));
        assert!(is_retriable_error(&sqlx::Error::PoolTimedOut));

        assert!(!is_retriable_error(&sqlx::Error::RowNotFound));
        assert!(!is_retriable_error(&sqlx::Error::PoolClosed));
        assert!(!is_retriable_error(&sqlx::Error::ColumnNotFound("x".into())));
    }

    #[tokio::test]
    async fn test_retry_succeeds_eventually() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = attempt_count.clone();

        let result = execute_with_retry_custom(
            || {
                let count = attempt_count_clone.clone();
                async move {
                    let current = count.fetch_add(1, Ordering::SeqCst) + 1;
                    if current < 3 {
                        Err(sqlx::Error::PoolTimedOut)
                    } else {
                        Ok(42)
                    }
                }
            },
            3,
            1,
            10,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_fails_after_max_attempts() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = attempt_count.clone();

        let result: Result<i32, sqlx::Error> = execute_with_retry_custom(
            || {
                let count = attempt_count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(io_error())
                }
            },
            3,
            1,
            10,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_non_retriable_error() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = attempt_count.clone();

        let result: Result<i32, sqlx::Error> = execute_with_retry(
            || {
                let count = attempt_count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(sqlx::Error::RowNotFound)
                }
            },
            3,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1); // Should not retry
    }
}
