//! # Circuit Breaker
//!
//! A textbook closed/open/half-open breaker guarding broker and result
//! backend calls. State is kept in atomics plus a mutex-protected instant so
//! the breaker can be shared behind an `Arc` without an async lock on the
//! hot path.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::resilience::behavior::CircuitBreakerBehavior;
use crate::resilience::metrics::CircuitBreakerMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout: Duration,
    /// Bound on attempts `Broker::guard` makes against a recoverable `BackendError`.
    pub retry_attempts: u32,
    /// Base delay `retry_with_jitter` draws its jittered backoff from.
    pub retry_base_delay: Duration,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(50),
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: CircuitBreakerSettings,
    state: Mutex<CircuitState>,
    opened_at: Mutex<Option<Instant>>,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
    total_calls: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: CircuitBreakerSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            state: Mutex::new(CircuitState::Closed),
            opened_at: Mutex::new(None),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            total_calls: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
        }
    }

    fn transition(&self, to: CircuitState) {
        let mut state = self.state.lock().unwrap();
        if *state != to {
            tracing::info!(circuit_breaker = %self.name, from = ?*state, to = ?to, "circuit breaker state transition");
            *state = to;
            if to == CircuitState::Open {
                *self.opened_at.lock().unwrap() = Some(Instant::now());
            }
        }
    }
}

impl CircuitBreakerBehavior for CircuitBreaker {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> CircuitState {
        *self.state.lock().unwrap()
    }

    fn should_allow(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self
                    .opened_at
                    .lock()
                    .unwrap()
                    .map(|at| at.elapsed())
                    .unwrap_or_default();
                if elapsed >= self.settings.timeout {
                    self.transition(CircuitState::HalfOpen);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self, _duration: Duration) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.success_count.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        if self.state() == CircuitState::HalfOpen {
            let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
            if successes >= self.settings.success_threshold {
                self.consecutive_successes.store(0, Ordering::Relaxed);
                self.transition(CircuitState::Closed);
            }
        }
    }

    fn record_failure(&self, _duration: Duration) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.consecutive_successes.store(0, Ordering::Relaxed);
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if self.state() != CircuitState::Open && failures >= self.settings.failure_threshold {
            self.transition(CircuitState::Open);
        }
    }

    fn is_healthy(&self) -> bool {
        self.state() != CircuitState::Open
    }

    fn force_open(&self) {
        self.transition(CircuitState::Open);
    }

    fn force_closed(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.transition(CircuitState::Closed);
    }

    fn metrics(&self) -> CircuitBreakerMetrics {
        let total = self.total_calls.load(Ordering::Relaxed);
        let success = self.success_count.load(Ordering::Relaxed);
        let failure = self.failure_count.load(Ordering::Relaxed);
        CircuitBreakerMetrics {
            total_calls: total,
            success_count: success,
            failure_count: failure,
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed) as u64,
            half_open_calls: 0,
            total_duration: Duration::ZERO,
            current_state: self.state(),
            failure_rate: if total == 0 { 0.0 } else { failure as f64 / total as f64 },
            success_rate: if total == 0 { 0.0 } else { success as f64 / total as f64 },
            average_duration: Duration::ZERO,
        }
    }
}
