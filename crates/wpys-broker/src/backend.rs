//! # Broker Backend
//!
//! The pluggable storage/queue/pub-sub contract a `Broker` drives, and the
//! in-memory reference implementation: a `DashMap` keyed store, a work-queue
//! and a per-job broadcast channel stand in for the KV-store-plus-blocking-
//! list-plus-pub-sub backing the broker contract calls for.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast;

use wpys_shared::errors::{WpysError, WpysResult};
use wpys_shared::model::{Job, JobStatus, StatusInfo};

use crate::queue::WorkQueue;
use crate::types::ControlKind;

/// Operations a broker storage backend must support.
#[async_trait]
pub trait BrokerBackend: Send + Sync + std::fmt::Debug {
    async fn create_job(&self, job: Job) -> WpysResult<Job>;
    async fn get_job(&self, id: &str) -> WpysResult<Job>;
    async fn enqueue_job(&self, id: &str) -> WpysResult<()>;
    async fn pick_job(&self) -> WpysResult<Job>;
    async fn update_job(&self, job: Job) -> WpysResult<()>;
    async fn update_job_status_info(&self, id: &str, info: StatusInfo) -> WpysResult<()>;
    async fn dismiss_job(&self, id: &str) -> WpysResult<()>;
    async fn pause_job(&self, id: &str) -> WpysResult<()>;
    async fn resume_job(&self, id: &str) -> WpysResult<()>;
    async fn get_job_notification(
        &self,
        id: &str,
        kinds: Option<&[ControlKind]>,
    ) -> WpysResult<ControlKind>;
}

const BROADCAST_CAPACITY: usize = 32;

/// In-memory reference backing. Not durable across process restarts — the
/// out-of-process backend (Redis, per the original design) is an explicitly
/// out-of-scope external collaborator.
#[derive(Debug)]
pub struct InMemoryBrokerBackend {
    jobs: DashMap<String, Job>,
    queue: WorkQueue,
    channels: DashMap<String, broadcast::Sender<ControlKind>>,
    ttl: Option<Duration>,
}

impl InMemoryBrokerBackend {
    pub fn new(ttl: Option<Duration>) -> Arc<Self> {
        let backend = Arc::new(Self {
            jobs: DashMap::new(),
            queue: WorkQueue::new(),
            channels: DashMap::new(),
            ttl,
        });
        if ttl.is_some() {
            spawn_reaper(Arc::clone(&backend));
        }
        backend
    }

    fn channel(&self, id: &str) -> broadcast::Sender<ControlKind> {
        self.channels
            .entry(id.to_string())
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .clone()
    }

    fn publish(&self, id: &str, kind: ControlKind) {
        // No active subscribers is not an error: the notification is fire-and-forget.
        let _ = self.channel(id).send(kind);
    }

    fn refresh_ttl(&self, job: &mut Job) {
        if let Some(ttl) = self.ttl {
            job.expires_at = Some(Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default());
        }
    }

    fn reap_expired(&self) {
        let now = Utc::now();
        let expired: Vec<String> = self
            .jobs
            .iter()
            .filter(|entry| entry.expires_at.is_some_and(|at| at <= now))
            .map(|entry| entry.key().clone())
            .collect();
        for id in expired {
            self.jobs.remove(&id);
            self.channels.remove(&id);
        }
    }
}

fn spawn_reaper(backend: Arc<InMemoryBrokerBackend>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            backend.reap_expired();
        }
    });
}

#[async_trait]
impl BrokerBackend for InMemoryBrokerBackend {
    async fn create_job(&self, mut job: Job) -> WpysResult<Job> {
        if self.jobs.contains_key(&job.id) {
            return Err(WpysError::validation_error("id", format!("duplicate job id: {}", job.id)));
        }
        self.refresh_ttl(&mut job);
        self.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: &str) -> WpysResult<Job> {
        self.jobs
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| WpysError::not_found(format!("no such job: {id}")))
    }

    async fn enqueue_job(&self, id: &str) -> WpysResult<()> {
        if !self.jobs.contains_key(id) {
            return Err(WpysError::not_found(format!("no such job: {id}")));
        }
        self.queue.push(id.to_string());
        Ok(())
    }

    async fn pick_job(&self) -> WpysResult<Job> {
        loop {
            let id = self.queue.pop().await;
            if let Some(entry) = self.jobs.get(&id) {
                return Ok(entry.clone());
            }
            // Job expired between enqueue and pop; move on to the next one.
        }
    }

    async fn update_job(&self, mut job: Job) -> WpysResult<()> {
        let previous_status = self
            .jobs
            .get(&job.id)
            .map(|entry| entry.status)
            .ok_or_else(|| WpysError::not_found(format!("no such job: {}", job.id)))?;

        if previous_status != job.status && !previous_status.can_transition_to(job.status) {
            return Err(WpysError::validation_error(
                "status",
                format!("illegal transition {:?} -> {:?}", previous_status, job.status),
            ));
        }

        self.refresh_ttl(&mut job);
        let terminal_kind = match job.status {
            JobStatus::Succeeded => Some(ControlKind::Succeeded),
            JobStatus::Failed => Some(ControlKind::Failed),
            JobStatus::Dismissed => Some(ControlKind::Dismiss),
            JobStatus::Paused => Some(ControlKind::Paused),
            _ => None,
        };
        self.jobs.insert(job.id.clone(), job.clone());
        if let Some(kind) = terminal_kind {
            self.publish(&job.id, kind);
        }
        Ok(())
    }

    async fn update_job_status_info(&self, id: &str, info: StatusInfo) -> WpysResult<()> {
        let mut entry = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| WpysError::not_found(format!("no such job: {id}")))?;

        if let (Some(previous), Some(attempted)) = (entry.status_info.percent_completed, info.percent_completed) {
            if attempted < previous {
                return Err(WpysError::MonotonicityViolation {
                    previous,
                    attempted,
                });
            }
        }
        entry.status_info = info;
        Ok(())
    }

    async fn dismiss_job(&self, id: &str) -> WpysResult<()> {
        let mut entry = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| WpysError::not_found(format!("no such job: {id}")))?;

        if entry.status == JobStatus::Dismissed {
            return Ok(());
        }
        if !entry.status.can_transition_to(JobStatus::Dismissed) {
            return Err(WpysError::validation_error(
                "status",
                format!("cannot dismiss job in status {:?}", entry.status),
            ));
        }
        entry.status = JobStatus::Dismissed;
        drop(entry);
        self.publish(id, ControlKind::Dismiss);
        Ok(())
    }

    async fn pause_job(&self, id: &str) -> WpysResult<()> {
        let mut entry = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| WpysError::not_found(format!("no such job: {id}")))?;

        if !entry.status.can_transition_to(JobStatus::Paused) {
            return Err(WpysError::validation_error(
                "status",
                format!("cannot pause job in status {:?}", entry.status),
            ));
        }
        entry.status = JobStatus::Paused;
        drop(entry);
        self.publish(id, ControlKind::Paused);
        Ok(())
    }

    async fn resume_job(&self, id: &str) -> WpysResult<()> {
        let mut entry = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| WpysError::not_found(format!("no such job: {id}")))?;

        if !entry.status.can_transition_to(JobStatus::Accepted) {
            return Err(WpysError::validation_error(
                "status",
                format!("cannot resume job in status {:?}", entry.status),
            ));
        }
        entry.status = JobStatus::Accepted;
        Ok(())
    }

    async fn get_job_notification(
        &self,
        id: &str,
        kinds: Option<&[ControlKind]>,
    ) -> WpysResult<ControlKind> {
        let mut receiver = self.channel(id).subscribe();
        loop {
            match receiver.recv().await {
                Ok(kind) => {
                    if kinds.map_or(true, |wanted| wanted.contains(&kind)) {
                        return Ok(kind);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(WpysError::backend_error("control channel closed"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> Job {
        Job::new(id, "echo", vec![], vec![])
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let backend = InMemoryBrokerBackend::new(None);
        let created = backend.create_job(job("job-1")).await.unwrap();
        let fetched = backend.get_job("job-1").await.unwrap();
        assert_eq!(created.id, fetched.id);
        assert_eq!(fetched.status, JobStatus::Accepted);
    }

    #[tokio::test]
    async fn duplicate_create_fails() {
        let backend = InMemoryBrokerBackend::new(None);
        backend.create_job(job("job-1")).await.unwrap();
        let err = backend.create_job(job("job-1")).await.unwrap_err();
        assert!(matches!(err, WpysError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn enqueue_then_pick_delivers_the_job() {
        let backend = InMemoryBrokerBackend::new(None);
        backend.create_job(job("job-1")).await.unwrap();
        backend.enqueue_job("job-1").await.unwrap();
        let picked = backend.pick_job().await.unwrap();
        assert_eq!(picked.id, "job-1");
    }

    #[tokio::test]
    async fn enqueue_missing_job_fails() {
        let backend = InMemoryBrokerBackend::new(None);
        let err = backend.enqueue_job("missing").await.unwrap_err();
        assert!(matches!(err, WpysError::NotFound(_)));
    }

    #[tokio::test]
    async fn pause_then_resume_round_trips_through_accepted() {
        let backend = InMemoryBrokerBackend::new(None);
        let mut j = backend.create_job(job("job-1")).await.unwrap();
        j.status = JobStatus::Running;
        backend.update_job(j).await.unwrap();

        backend.pause_job("job-1").await.unwrap();
        assert_eq!(backend.get_job("job-1").await.unwrap().status, JobStatus::Paused);

        backend.resume_job("job-1").await.unwrap();
        assert_eq!(backend.get_job("job-1").await.unwrap().status, JobStatus::Accepted);
    }

    #[tokio::test]
    async fn pause_rejects_illegal_source_status() {
        let backend = InMemoryBrokerBackend::new(None);
        backend.create_job(job("job-1")).await.unwrap();
        let err = backend.pause_job("job-1").await.unwrap_err();
        assert!(matches!(err, WpysError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn dismiss_is_idempotent() {
        let backend = InMemoryBrokerBackend::new(None);
        backend.create_job(job("job-1")).await.unwrap();
        backend.dismiss_job("job-1").await.unwrap();
        backend.dismiss_job("job-1").await.unwrap();
        let fetched = backend.get_job("job-1").await.unwrap();
        assert_eq!(fetched.status, JobStatus::Dismissed);
    }

    #[tokio::test]
    async fn update_job_rejects_illegal_transition() {
        let backend = InMemoryBrokerBackend::new(None);
        let mut j = backend.create_job(job("job-1")).await.unwrap();
        j.status = JobStatus::Succeeded;
        let err = backend.update_job(j).await.unwrap_err();
        assert!(matches!(err, WpysError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn status_info_rejects_non_monotonic_percent() {
        let backend = InMemoryBrokerBackend::new(None);
        backend.create_job(job("job-1")).await.unwrap();
        backend
            .update_job_status_info(
                "job-1",
                StatusInfo {
                    percent_completed: Some(80),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = backend
            .update_job_status_info(
                "job-1",
                StatusInfo {
                    percent_completed: Some(40),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WpysError::MonotonicityViolation { .. }));
    }

    #[tokio::test]
    async fn notification_filters_by_requested_kinds() {
        let backend = Arc::new(InMemoryBrokerBackend::new(None));
        let mut j = backend.create_job(job("job-1")).await.unwrap();
        let waiter_backend = Arc::clone(&backend);
        let waiter = tokio::spawn(async move {
            waiter_backend
                .get_job_notification("job-1", Some(&[ControlKind::Succeeded]))
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        j.status = JobStatus::Running;
        backend.update_job(j.clone()).await.unwrap();
        j.status = JobStatus::Succeeded;
        backend.update_job(j).await.unwrap();

        let kind = waiter.await.unwrap().unwrap();
        assert_eq!(kind, ControlKind::Succeeded);
    }

    #[tokio::test]
    async fn ttl_expiry_removes_job() {
        let backend = InMemoryBrokerBackend::new(Some(Duration::from_millis(20)));
        backend.create_job(job("job-1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        let err = backend.get_job("job-1").await.unwrap_err();
        assert!(matches!(err, WpysError::NotFound(_)));
    }
}
