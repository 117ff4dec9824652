//! Bounded optimistic retry around version-guarded mutations.

use tracing::debug;

/// Errors that the guard may retry.
///
/// A conflict means a concurrent writer advanced a row version between this
/// attempt's load and save; the attempt is discarded and rerun from a fresh
/// load. Any other error propagates immediately.
pub trait Retryable {
    fn is_conflict(&self) -> bool;

    /// Convert the final conflict into the operation's retries-exhausted form.
    fn into_exhausted(self, attempts: u32) -> Self;
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Runs a load-mutate-save closure until it commits or the attempt budget
/// runs out. Never merges concurrent writes.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyGuard {
    max_attempts: u32,
}

impl Default for ConcurrencyGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl ConcurrencyGuard {
    pub fn new(max_attempts: u32) -> Self {
        assert!(max_attempts >= 1, "at least one attempt is required");
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn run<T, E, F>(&self, mut attempt: F) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_conflict() && attempts < self.max_attempts => {
                    debug!(attempts, "version conflict, retrying from fresh load");
                }
                Err(e) if e.is_conflict() => return Err(e.into_exhausted(attempts)),
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Conflict,
        Exhausted(u32),
        Fatal,
    }

    impl Retryable for TestError {
        fn is_conflict(&self) -> bool {
            matches!(self, TestError::Conflict)
        }

        fn into_exhausted(self, attempts: u32) -> Self {
            TestError::Exhausted(attempts)
        }
    }

    #[test]
    fn first_attempt_success_runs_once() {
        let mut calls = 0;
        let result: Result<i32, TestError> = ConcurrencyGuard::default().run(|| {
            calls += 1;
            Ok(7)
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn conflicts_are_retried_until_success() {
        let mut calls = 0;
        let result: Result<i32, TestError> = ConcurrencyGuard::new(3).run(|| {
            calls += 1;
            if calls < 3 { Err(TestError::Conflict) } else { Ok(42) }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn exhausting_attempts_surfaces_the_bound() {
        let mut calls = 0;
        let result: Result<(), TestError> = ConcurrencyGuard::new(3).run(|| {
            calls += 1;
            Err(TestError::Conflict)
        });
        assert_eq!(result.unwrap_err(), TestError::Exhausted(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn non_conflict_errors_propagate_immediately() {
        let mut calls = 0;
        let result: Result<(), TestError> = ConcurrencyGuard::new(5).run(|| {
            calls += 1;
            Err(TestError::Fatal)
        });
        assert_eq!(result.unwrap_err(), TestError::Fatal);
        assert_eq!(calls, 1);
    }

    #[test]
    #[should_panic(expected = "at least one attempt")]
    fn zero_attempts_is_rejected() {
        let _ = ConcurrencyGuard::new(0);
    }
}
