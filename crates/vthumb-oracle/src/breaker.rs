//! Circuit breaker for oracle calls.
//!
//! After `failure_threshold` consecutive failures the breaker opens and
//! calls fail fast for `recovery_timeout`. It then half-opens and closes
//! again after `success_threshold` successes; any failure while half-open
//! reopens it.

use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Circuit breaker states.
#[derive(Clone, Debug, PartialEq)]
pub enum CircuitState {
    /// Normal operation; counts consecutive failures
    Closed { failures: u32 },
    /// Failing fast
    Open { opened_at: Instant },
    /// Letting calls through to test recovery
    HalfOpen { success_count: u32 },
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed { .. } => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen { .. } => "half_open",
        }
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreaker {
    state: Arc<RwLock<CircuitState>>,
    failure_threshold: u32,
    recovery_timeout: Duration,
    success_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration, success_threshold: u32) -> Self {
        Self {
            state: Arc::new(RwLock::new(CircuitState::Closed { failures: 0 })),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            success_threshold: success_threshold.max(1),
        }
    }

    fn lock(&self) -> RwLockWriteGuard<'_, CircuitState> {
        // State stays consistent across a panic, so a poisoned lock is usable
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Check if a call is allowed.
    pub fn allow(&self) -> bool {
        let mut state = self.lock();
        match *state {
            CircuitState::Closed { .. } | CircuitState::HalfOpen { .. } => true,
            CircuitState::Open { opened_at } => {
                if opened_at.elapsed() >= self.recovery_timeout {
                    *state = CircuitState::HalfOpen { success_count: 0 };
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub fn success(&self) {
        let mut state = self.lock();
        match *state {
            CircuitState::Closed { .. } => *state = CircuitState::Closed { failures: 0 },
            CircuitState::HalfOpen { success_count } => {
                let count = success_count + 1;
                *state = if count >= self.success_threshold {
                    CircuitState::Closed { failures: 0 }
                } else {
                    CircuitState::HalfOpen { success_count: count }
                };
            }
            CircuitState::Open { .. } => {}
        }
    }

    /// Record a failed call.
    pub fn failure(&self) {
        let mut state = self.lock();
        match *state {
            CircuitState::Closed { failures } => {
                let failures = failures + 1;
                *state = if failures >= self.failure_threshold {
                    CircuitState::Open { opened_at: Instant::now() }
                } else {
                    CircuitState::Closed { failures }
                };
            }
            CircuitState::HalfOpen { .. } => {
                *state = CircuitState::Open { opened_at: Instant::now() };
            }
            CircuitState::Open { .. } => {}
        }
    }

    /// Current state for monitoring.
    pub fn state(&self) -> CircuitState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60), 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60), 1);

        breaker.failure();
        breaker.failure();
        assert!(breaker.allow());
        breaker.failure();
        assert_eq!(breaker.state().as_str(), "open");
        assert!(!breaker.allow());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60), 1);

        breaker.failure();
        breaker.success();
        breaker.failure();
        assert_eq!(breaker.state(), CircuitState::Closed { failures: 1 });
    }

    #[test]
    fn test_half_open_recovery() {
        let breaker = CircuitBreaker::new(1, Duration::ZERO, 2);

        breaker.failure();
        assert!(breaker.allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen { success_count: 0 });

        breaker.success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen { success_count: 1 });
        breaker.success();
        assert_eq!(breaker.state(), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_failure_while_half_open_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::ZERO, 2);

        breaker.failure();
        assert!(breaker.allow());
        breaker.failure();
        assert_eq!(breaker.state().as_str(), "open");
    }
}
