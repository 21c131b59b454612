//! Bounded retry for native library readiness
//!
//! The native library may return from initialization before it can answer
//! queries. Readiness is confirmed by retrying an operation while it reports
//! [`NativeError::NotReady`], sleeping a fixed interval between attempts.

use crate::error::{NativeError, PluginError};

use std::time::Duration;

/// Blocking wait between attempts, injectable for tests
pub trait Sleeper: Send {
    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Retry budget for the readiness confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts (at least 1)
    pub max_attempts: u32,
    /// Wait between consecutive attempts
    pub interval: Duration,
}

impl RetryPolicy {
    /// Default number of attempts
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    /// Default wait between attempts
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

    /// Create a new retry policy
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Worst-case time spent sleeping before giving up
    pub fn worst_case_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent
    ///
    /// On success returns the value and the number of retries consumed.
    /// `plugin` names the caller in log lines.
    ///
    /// # Errors
    /// Returns `PluginError::NotReadyAfterRetries` when every attempt reported
    /// not-ready, or the first non-retryable error unchanged.
    pub fn run<T, F>(
        &self,
        plugin: &str,
        sleeper: &dyn Sleeper,
        mut op: F,
    ) -> Result<(T, u32), PluginError>
    where
        F: FnMut() -> Result<T, NativeError>,
    {
        let mut retries = 0;

        loop {
            match op() {
                Ok(value) => return Ok((value, retries)),
                Err(e) if e.is_not_ready() => {
                    log::warn!(
                        "{} plugin: Readiness check failed (attempt {}/{}): {}",
                        plugin,
                        retries + 1,
                        self.max_attempts,
                        e
                    );
                    if retries + 1 >= self.max_attempts {
                        return Err(PluginError::NotReadyAfterRetries {
                            attempts: self.max_attempts,
                        });
                    }
                    sleeper.sleep(self.interval);
                    retries += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_INTERVAL)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{capture_logs, captured, RecordingSleeper};
    use super::*;

    fn not_ready() -> NativeError {
        NativeError::NotReady("starting".to_string())
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.interval, Duration::from_millis(1000));
        assert_eq!(policy.worst_case_wait(), Duration::from_secs(4));
    }

    #[test]
    fn test_retry_policy_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn test_immediate_success_does_not_sleep() {
        let sleeper = RecordingSleeper::default();
        let (value, retries) = RetryPolicy::default().run("Test", &sleeper, || Ok(7)).unwrap();

        assert_eq!(value, 7);
        assert_eq!(retries, 0);
        assert_eq!(sleeper.count(), 0);
    }

    #[test]
    fn test_success_after_retries() {
        for failures in 0..5u32 {
            let sleeper = RecordingSleeper::default();
            let mut remaining = failures;
            let (_, retries) = RetryPolicy::default()
                .run("Test", &sleeper, || {
                    if remaining > 0 {
                        remaining -= 1;
                        Err(not_ready())
                    } else {
                        Ok(())
                    }
                })
                .unwrap();

            assert_eq!(retries, failures);
            assert_eq!(sleeper.count(), failures as usize);
        }
    }

    #[test]
    fn test_exhausted_budget() {
        let sleeper = RecordingSleeper::default();
        let mut attempts = 0;
        let result: Result<((), u32), _> = RetryPolicy::default().run("Test", &sleeper, || {
            attempts += 1;
            Err(not_ready())
        });

        assert!(matches!(
            result,
            Err(PluginError::NotReadyAfterRetries { attempts: 5 })
        ));
        assert_eq!(attempts, 5);
        assert_eq!(sleeper.count(), 4);
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let sleeper = RecordingSleeper::default();
        let mut attempts = 0;
        let result: Result<((), u32), _> = RetryPolicy::default().run("Test", &sleeper, || {
            attempts += 1;
            Err(NativeError::GpuLost)
        });

        assert!(matches!(
            result,
            Err(PluginError::Native(NativeError::GpuLost))
        ));
        assert_eq!(attempts, 1);
        assert_eq!(sleeper.count(), 0);
    }

    #[test]
    fn test_not_ready_attempts_are_logged_with_plugin_name() {
        capture_logs();
        let sleeper = RecordingSleeper::default();
        let _ = RetryPolicy::new(2, Duration::ZERO).run("Retrying", &sleeper, || {
            Err::<(), _>(NativeError::NotReady("warming up".to_string()))
        });

        let lines = captured("warming up");
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "Retrying plugin: Readiness check failed (attempt 1/2): \
             Native library is not ready yet: warming up"
        );
        assert!(lines.iter().all(|l| l.starts_with("Retrying plugin: ")));
    }
}
