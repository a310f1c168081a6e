//! # Circuit Breaker Behavior Trait
//!
//! `Broker::guard` and a result backend's own call sites both need to gate a
//! call, record its outcome, and report health, without caring whether the
//! concrete breaker is the atomics-based [`CircuitBreaker`](crate::resilience::CircuitBreaker)
//! or a future alternative. This trait is that seam.
//!
//! ## Design
//!
//! Object-safe (`Send + Sync + Debug`) so a caller can hold `&dyn
//! CircuitBreakerBehavior` when it just needs uniform health reporting across
//! whatever breakers are live (e.g. a `GetCapabilities` health rollup).
//! `Broker::guard` itself holds a concrete `Arc<CircuitBreaker>` for zero-cost
//! dispatch on its hot path.

use crate::resilience::{CircuitBreakerMetrics, CircuitState};
use std::time::Duration;

/// What a job backend's guard needs from its breaker, independent of which
/// concrete breaker is backing it:
/// - **Pre-flight check**: `should_allow()` — gate the backend call before it's attempted
/// - **Recording**: `record_success()` / `record_failure()` — update state after the call returns
/// - **Observability**: `state()`, `metrics()`, `is_healthy()`, `name()`
/// - **Emergency**: `force_open()`, `force_closed()` — operator override, e.g. during a known backend outage
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn CircuitBreakerBehavior`.
pub trait CircuitBreakerBehavior: Send + Sync + std::fmt::Debug {
    /// Name of the backend this circuit breaker guards, e.g. `"broker-backend"`.
    fn name(&self) -> &str;

    /// Get the current circuit state
    fn state(&self) -> CircuitState;

    /// Check if the circuit allows the next call.
    ///
    /// Returns `true` for Closed state, `true` for HalfOpen (limited), and
    /// `true` for Open only when the recovery timeout has elapsed (transitioning to HalfOpen).
    fn should_allow(&self) -> bool;

    /// Record a successful backend call with its duration
    fn record_success(&self, duration: Duration);

    /// Record a failed backend call with its duration
    fn record_failure(&self, duration: Duration);

    /// Check if the circuit breaker considers the backend healthy
    fn is_healthy(&self) -> bool;

    /// Force the circuit to open state (emergency kill switch)
    fn force_open(&self);

    /// Force the circuit to closed state (emergency recovery)
    fn force_closed(&self);

    /// Get a metrics snapshot for observability
    fn metrics(&self) -> CircuitBreakerMetrics;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time proof that `Broker::guard` can hold this behind `dyn`.
    fn _assert_guard_can_hold_dyn_breaker(_: &dyn CircuitBreakerBehavior) {}
}
