//! # Result Backend
//!
//! The byte-storage hook the core consumes but does not implement: large
//! outputs are kept out of Job state entirely, referenced only by a content
//! identifier and size. Only an in-memory reference implementation lives
//! here; the real backend is an external collaborator (spec'd in §6).

use async_trait::async_trait;
use dashmap::DashMap;

use crate::errors::{WpysError, WpysResult};

#[async_trait]
pub trait ResultBackend: Send + Sync + std::fmt::Debug {
    async fn put_job_result(&self, job_id: &str, output_name: &str, bytes: Vec<u8>) -> WpysResult<String>;
    async fn get_job_result(&self, content_id: &str) -> WpysResult<Vec<u8>>;
}

#[derive(Debug, Default)]
pub struct InMemoryResultBackend {
    blobs: DashMap<String, Vec<u8>>,
}

impl InMemoryResultBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultBackend for InMemoryResultBackend {
    async fn put_job_result(&self, job_id: &str, output_name: &str, bytes: Vec<u8>) -> WpysResult<String> {
        let content_id = format!("{job_id}/{output_name}/{}", uuid::Uuid::new_v4());
        self.blobs.insert(content_id.clone(), bytes);
        Ok(content_id)
    }

    async fn get_job_result(&self, content_id: &str) -> WpysResult<Vec<u8>> {
        self.blobs
            .get(content_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| WpysError::not_found(format!("no such result: {content_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let backend = InMemoryResultBackend::new();
        let content_id = backend
            .put_job_result("job-1", "BUFFERED_GEOMETRY", b"42".to_vec())
            .await
            .unwrap();
        let bytes = backend.get_job_result(&content_id).await.unwrap();
        assert_eq!(bytes, b"42");
    }

    #[tokio::test]
    async fn get_unknown_content_id_fails() {
        let backend = InMemoryResultBackend::new();
        let err = backend.get_job_result("missing").await.unwrap_err();
        assert!(matches!(err, WpysError::NotFound(_)));
    }
}
