//! Bounded exponential backoff around a single chat round trip.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rand::Rng;

use super::error::LlmError;

/// Jitter magnitude as a fraction of the computed delay.
const JITTER_FRACTION: f64 = 0.1;

/// Cancellation signal shared between the caller and the retry loop.
///
/// Cloning hands out another handle to the same flag. `wait_timeout` is the
/// cancellable sleep used between attempts.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Block for up to `timeout`, waking early on cancellation.
    /// Returns true if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let result = self.inner.cond.wait_for(&mut cancelled, deadline - now);
            if result.timed_out() {
                break;
            }
        }
        *cancelled
    }
}

/// Source of the randomized perturbation added to each backoff delay.
pub trait JitterSource: Send + Sync + std::fmt::Debug {
    /// Uniform sample in [-1, 1]; scaled by `JITTER_FRACTION * delay`.
    fn sample(&self) -> f64;
}

/// Thread-local PRNG jitter, the production source.
#[derive(Debug)]
pub struct RandJitter;

impl JitterSource for RandJitter {
    fn sample(&self) -> f64 {
        rand::rng().random_range(-1.0..=1.0)
    }
}

/// Attempt budget and base delay for [`RetryPolicy::run`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Run `op` up to `max_attempts` times.
    ///
    /// Cancellation is checked before every attempt and during the backoff
    /// wait; it propagates immediately and never consumes a retry slot.
    /// Non-retryable errors (protocol problems, deadlines) also propagate
    /// immediately. Once the budget is spent, the last failure is wrapped in
    /// [`LlmError::RetriesExhausted`] with the attempt count.
    pub fn run<T, F>(
        &self,
        cancel: &CancelToken,
        jitter: &dyn JitterSource,
        mut op: F,
    ) -> Result<T, LlmError>
    where
        F: FnMut() -> Result<T, LlmError>,
    {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(LlmError::Cancelled);
            }

            let err = match op() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() {
                return Err(err);
            }

            attempt += 1;
            if attempt >= self.max_attempts {
                return Err(LlmError::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = self.delay_after(attempt, jitter);
            log::warn!(
                "chat attempt {attempt}/{max} failed: {err}; retrying in {delay:?}",
                max = self.max_attempts
            );
            if cancel.wait_timeout(delay) {
                return Err(LlmError::Cancelled);
            }
        }
    }

    /// Delay before attempt `failed + 1`: `base * 2^(failed - 1)`, jittered.
    /// The sample is clamped so the jitter never exceeds ±10% of the delay.
    fn delay_after(&self, failed: u32, jitter: &dyn JitterSource) -> Duration {
        let backoff = self.base_delay.saturating_mul(1u32 << (failed - 1).min(31));
        backoff.mul_f64(1.0 + JITTER_FRACTION * jitter.sample().clamp(-1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    /// Fixed-sample jitter for deterministic timing.
    #[derive(Debug)]
    struct FixedJitter(f64);

    impl JitterSource for FixedJitter {
        fn sample(&self) -> f64 {
            self.0
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        }
    }

    fn http_500() -> LlmError {
        LlmError::RequestFailed {
            status: 500,
            body: "server exploded".to_string(),
        }
    }

    #[test]
    fn first_success_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result = fast_policy().run(&CancelToken::new(), &FixedJitter(0.0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("ok")
        });
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn recovers_after_two_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast_policy().run(&CancelToken::new(), &FixedJitter(0.0), || {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(http_500())
            } else {
                Ok("recovered")
            }
        });
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhaustion_names_the_attempt_count() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy().run(&CancelToken::new(), &FixedJitter(0.0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(http_500())
        });

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            LlmError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, LlmError::RequestFailed { status: 500, .. }));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[test]
    fn protocol_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy().run(&CancelToken::new(), &FixedJitter(0.0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::EmptyResponse)
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), LlmError::EmptyResponse));
    }

    #[test]
    fn cancelled_token_short_circuits_before_any_attempt() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy().run(&cancel, &FixedJitter(0.0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(result.unwrap_err(), LlmError::Cancelled));
    }

    #[test]
    fn cancellation_interrupts_the_backoff_wait() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(30),
        };
        let cancel = CancelToken::new();
        let waiter = cancel.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            waiter.cancel();
        });

        let started = Instant::now();
        let result: Result<(), _> = policy.run(&cancel, &FixedJitter(0.0), || Err(http_500()));
        handle.join().expect("cancel thread panicked");

        assert!(matches!(result.unwrap_err(), LlmError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn backoff_doubles_and_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        };

        let flat = FixedJitter(0.0);
        assert_eq!(policy.delay_after(1, &flat), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2, &flat), Duration::from_secs(2));

        let high = FixedJitter(1.0);
        let low = FixedJitter(-1.0);
        assert_eq!(policy.delay_after(1, &high), Duration::from_millis(1100));
        assert_eq!(policy.delay_after(1, &low), Duration::from_millis(900));

        // A source that misbehaves is clamped to the contract bound.
        let wild = FixedJitter(37.0);
        assert_eq!(policy.delay_after(1, &wild), Duration::from_millis(1100));
    }

    #[test]
    fn wait_timeout_expires_without_cancellation() {
        let cancel = CancelToken::new();
        assert!(!cancel.wait_timeout(Duration::from_millis(10)));
        assert!(!cancel.is_cancelled());
    }
}
