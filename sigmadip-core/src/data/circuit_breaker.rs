//! Circuit breaker for provider rate limiting and IP bans.
//!
//! After HTTP 403 or repeated failures the breaker opens and refuses every
//! request until the cooldown has passed (default 30 minutes). A single run
//! touches only a handful of tickers, so once it opens the remaining tickers
//! fall through to the next fallback source immediately.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed { consecutive_failures: u32 },
    Open { tripped_at: Instant },
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::Closed {
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: 3,
        }
    }

    /// 30-minute cooldown, trips after 3 consecutive failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut BreakerState) -> T) -> T {
        // A poisoned lock only means another thread panicked mid-update;
        // the state itself is always a valid enum value.
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn is_allowed(&self) -> bool {
        let cooldown = self.cooldown;
        self.with_state(|state| match *state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { tripped_at } if tripped_at.elapsed() >= cooldown => {
                *state = BreakerState::Closed {
                    consecutive_failures: 0,
                };
                true
            }
            BreakerState::Open { .. } => false,
        })
    }

    pub fn record_success(&self) {
        self.with_state(|state| {
            *state = BreakerState::Closed {
                consecutive_failures: 0,
            }
        });
    }

    pub fn record_failure(&self) {
        let threshold = self.failure_threshold;
        self.with_state(|state| {
            if let BreakerState::Closed {
                consecutive_failures,
            } = *state
            {
                let failures = consecutive_failures + 1;
                *state = if failures >= threshold {
                    BreakerState::Open {
                        tripped_at: Instant::now(),
                    }
                } else {
                    BreakerState::Closed {
                        consecutive_failures: failures,
                    }
                };
            }
        });
    }

    /// Open immediately (403 Forbidden).
    pub fn trip(&self) {
        self.with_state(|state| {
            *state = BreakerState::Open {
                tripped_at: Instant::now(),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        assert!(CircuitBreaker::new(Duration::from_secs(60)).is_allowed());
    }

    #[test]
    fn trips_after_threshold_failures() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_allowed());
        cb.record_failure();
        assert!(!cb.is_allowed());
    }

    #[test]
    fn success_resets_counter() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert!(cb.is_allowed());
    }

    #[test]
    fn trip_then_expire() {
        let cb = CircuitBreaker::new(Duration::from_millis(10));
        cb.trip();
        assert!(!cb.is_allowed());
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.is_allowed());
    }
}
