//! # Broker Facade
//!
//! The single source of truth for job state. Wraps a pluggable
//! [`BrokerBackendKind`] with an optional circuit breaker so a flaky
//! out-of-process backend fails fast instead of hanging every caller —
//! transparent when the breaker is closed, which it always is against the
//! in-memory backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use wpys_shared::errors::WpysResult;
use wpys_shared::model::{Job, StatusInfo};
use wpys_shared::resilience::{retry_with_jitter, CircuitBreaker, CircuitBreakerBehavior, CircuitBreakerSettings};

use crate::backend::{BrokerBackend, InMemoryBrokerBackend};
use crate::types::ControlKind;

/// Enum-dispatch over backend implementations. An out-of-process backend
/// (Redis, matching the design this was distilled from) would add a variant
/// here rather than a second trait-object call site.
#[derive(Debug, Clone)]
pub enum BrokerBackendKind {
    InMemory(Arc<InMemoryBrokerBackend>),
}

impl BrokerBackendKind {
    fn as_backend(&self) -> &dyn BrokerBackend {
        match self {
            BrokerBackendKind::InMemory(backend) => backend.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Broker {
    backend: BrokerBackendKind,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
    retry_attempts: u32,
    retry_base_delay: Duration,
}

impl Broker {
    pub fn new_in_memory(ttl: Option<Duration>) -> Self {
        let defaults = CircuitBreakerSettings::default();
        Self {
            backend: BrokerBackendKind::InMemory(InMemoryBrokerBackend::new(ttl)),
            circuit_breaker: None,
            retry_attempts: defaults.retry_attempts,
            retry_base_delay: defaults.retry_base_delay,
        }
    }

    pub fn with_circuit_breaker(mut self, settings: CircuitBreakerSettings) -> Self {
        self.retry_attempts = settings.retry_attempts;
        self.retry_base_delay = settings.retry_base_delay;
        self.circuit_breaker = Some(Arc::new(CircuitBreaker::new("broker-backend", settings)));
        self
    }

    /// Runs `operation`, retrying a recoverable `BackendError` with jittered
    /// backoff, and records the final outcome against the circuit breaker.
    async fn guard<T, F, Fut>(&self, mut operation: F) -> WpysResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = WpysResult<T>>,
    {
        if let Some(cb) = &self.circuit_breaker {
            if !cb.should_allow() {
                return Err(wpys_shared::errors::WpysError::backend_error(
                    "broker backend circuit breaker is open",
                ));
            }
            let started = Instant::now();
            let result = retry_with_jitter(self.retry_attempts, self.retry_base_delay, &mut operation).await;
            match &result {
                Ok(_) => cb.record_success(started.elapsed()),
                Err(e) if e.is_recoverable() => cb.record_failure(started.elapsed()),
                Err(_) => {}
            }
            result
        } else {
            retry_with_jitter(self.retry_attempts, self.retry_base_delay, &mut operation).await
        }
    }

    #[tracing::instrument(skip(self, inputs, outputs))]
    pub async fn create_job(
        &self,
        id: impl Into<String> + std::fmt::Debug,
        process_id: impl Into<String> + std::fmt::Debug,
        inputs: Vec<(String, serde_json::Value)>,
        outputs: Vec<wpys_shared::model::OutputDescriptor>,
    ) -> WpysResult<Job> {
        let job = Job::new(id, process_id, inputs, outputs);
        self.guard(|| self.backend.as_backend().create_job(job.clone())).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_job(&self, id: &str) -> WpysResult<Job> {
        self.guard(|| self.backend.as_backend().get_job(id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn enqueue_job(&self, id: &str) -> WpysResult<()> {
        self.guard(|| self.backend.as_backend().enqueue_job(id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn pick_job(&self) -> WpysResult<Job> {
        self.guard(|| self.backend.as_backend().pick_job()).await
    }

    #[tracing::instrument(skip(self, job))]
    pub async fn update_job(&self, job: Job) -> WpysResult<()> {
        self.guard(|| self.backend.as_backend().update_job(job.clone())).await
    }

    #[tracing::instrument(skip(self, info))]
    pub async fn update_job_status_info(&self, id: &str, info: StatusInfo) -> WpysResult<()> {
        self.guard(|| self.backend.as_backend().update_job_status_info(id, info.clone()))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn dismiss_job(&self, id: &str) -> WpysResult<()> {
        self.guard(|| self.backend.as_backend().dismiss_job(id)).await
    }

    /// Moves a RUNNING job to PAUSED. Not exposed through the Dispatcher as
    /// a request variant; reachable only by direct `Broker` callers.
    #[tracing::instrument(skip(self))]
    pub async fn pause_job(&self, id: &str) -> WpysResult<()> {
        self.guard(|| self.backend.as_backend().pause_job(id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn resume_job(&self, id: &str) -> WpysResult<()> {
        self.guard(|| self.backend.as_backend().resume_job(id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_job_notification(
        &self,
        id: &str,
        kinds: Option<&[ControlKind]>,
    ) -> WpysResult<ControlKind> {
        self.guard(|| self.backend.as_backend().get_job_notification(id, kinds))
            .await
    }
}
