//! # Circuit Breaker Configuration
//!
//! Canonical configuration for the circuit breaker guarding broker backend
//! calls, plus the adapter that turns it into the resilience module's types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout_seconds: u32,
    /// Bound on attempts `Broker::guard` makes against a recoverable `BackendError`.
    pub retry_attempts: u32,
    /// Base delay, in milliseconds, `retry_with_jitter` draws its jittered backoff from.
    pub retry_base_delay_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_base_delay_ms: 50,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn to_resilience_config(&self) -> crate::resilience::CircuitBreakerSettings {
        crate::resilience::CircuitBreakerSettings {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout: Duration::from_secs(self.timeout_seconds as u64),
            retry_attempts: self.retry_attempts,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_thresholds() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.success_threshold, 2);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 50);
    }

    #[test]
    fn converts_seconds_to_duration() {
        let config = CircuitBreakerConfig {
            timeout_seconds: 10,
            ..CircuitBreakerConfig::default()
        };
        let resilience = config.to_resilience_config();
        assert_eq!(resilience.timeout, Duration::from_secs(10));
    }

    #[test]
    fn converts_retry_settings() {
        let config = CircuitBreakerConfig {
            retry_attempts: 7,
            retry_base_delay_ms: 200,
            ..CircuitBreakerConfig::default()
        };
        let resilience = config.to_resilience_config();
        assert_eq!(resilience.retry_attempts, 7);
        assert_eq!(resilience.retry_base_delay, Duration::from_millis(200));
    }
}
