//! # Circuit Breaker Module
//!
//! Circuit breaker guarding notification delivery. When the notification channel keeps
//! failing, further attempts fail fast until the reset timeout has elapsed, so a dead
//! channel cannot stall a run with retries.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for notification delivery
///
/// # State Machine
///
/// - **Closed**: normal operation, deliveries pass through
/// - **Open**: failure threshold reached, deliveries are skipped
/// - after `circuit_breaker_reset_secs` the breaker closes again and the next delivery is
///   attempted
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use phone_buckets::circuit_breaker::CircuitBreaker;
    /// use phone_buckets::config::RecoveryConfig;
    ///
    /// let breaker = CircuitBreaker::new(&RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: config.circuit_breaker_threshold,
            reset_after: Duration::from_secs(config.circuit_breaker_reset_secs),
        }
    }

    /// Whether deliveries should currently be skipped.
    ///
    /// Resets to closed once the reset timeout has elapsed since the last failure.
    pub fn is_open(&self) -> bool {
        let mut state = self.lock();

        if state.failure_count < self.threshold {
            return false;
        }

        match state.last_failure_time {
            Some(last) if last.elapsed() < self.reset_after => true,
            _ => {
                *state = BreakerState::default();
                false
            }
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
    }

    pub fn record_success(&self) {
        *self.lock() = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    // A panic while holding the lock leaves plain counters behind, still usable
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
