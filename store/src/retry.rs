use std::future::Future;
use std::time::Duration;

/// Errors that signal a transient storage conflict.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Replays a whole storage transaction after a serialization failure or
/// deadlock, with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(20),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero based): 20, 40, 80, ... ms.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "Storage conflict, retrying in {}ms (attempt {}/{}): {}",
                        delay.as_millis(),
                        attempt + 1,
                        attempts,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    log::error!("Storage conflict persisted after {attempts} attempts: {err}");
                    return Err(err);
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug, PartialEq)]
    enum FakeError {
        Conflict,
        Fatal,
    }

    impl std::fmt::Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Retryable for FakeError {
        fn is_retryable(&self) -> bool {
            matches!(self, FakeError::Conflict)
        }
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(20));
        assert_eq!(policy.delay_for(1), Duration::from_millis(40));
        assert_eq!(policy.delay_for(3), Duration::from_millis(160));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = RetryPolicy::default()
            .run(move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(FakeError::Conflict)
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = RetryPolicy::new(3)
            .run(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Conflict)
            })
            .await;
        assert_eq!(result, Err(FakeError::Conflict));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = RetryPolicy::default()
            .run(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Fatal)
            })
            .await;
        assert_eq!(result, Err(FakeError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
