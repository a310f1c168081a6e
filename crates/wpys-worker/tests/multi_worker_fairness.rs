//! Two independent `WorkerEngine` loops sharing one broker: every enqueued
//! job must be picked by exactly one of them, and every job must finish
//! `Succeeded` — the work-stealing queue underneath must never double-hand a
//! job out, and never drop one either.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wpys_broker::Broker;
use wpys_shared::model::{DataKind, ExecutionShape, Format, InputDescriptor, JobStatus, Metadata, ProcessDescriptor};
use wpys_shared::registry::ProcessRegistry;
use wpys_shared::result_backend::{InMemoryResultBackend, ResultBackend};
use wpys_worker::{BlockingProcessBody, Emitter, ProcessBody, ProcessBodyRegistry, ResultEmission, WorkerEngine};

struct CountingEcho {
    picked: Arc<Mutex<HashSet<String>>>,
    ran: AtomicUsize,
}

impl BlockingProcessBody for CountingEcho {
    fn run(&self, inputs: &[(String, serde_json::Value)], emitter: Emitter) -> wpys_shared::errors::WpysResult<()> {
        let job_id = inputs[0].1.as_str().unwrap().to_string();
        assert!(self.picked.lock().unwrap().insert(job_id), "job picked more than once");
        self.ran.fetch_add(1, Ordering::SeqCst);
        emitter.emit_result(ResultEmission {
            output_identifier: Some("RESULT".to_string()),
            bytes: b"ok".to_vec(),
            mime_type: "text/plain".to_string(),
        });
        Ok(())
    }
}

fn descriptor() -> ProcessDescriptor {
    ProcessDescriptor {
        identifier: "tag".to_string(),
        metadata: Metadata::default(),
        inputs: vec![InputDescriptor {
            identifier: "JOB_ID".to_string(),
            metadata: Metadata::default(),
            formats: vec![Format::new("text/plain")],
            data_kind: DataKind::Complex,
        }],
        outputs: vec![InputDescriptor {
            identifier: "RESULT".to_string(),
            metadata: Metadata::default(),
            formats: vec![Format::new("text/plain")],
            data_kind: DataKind::Complex,
        }],
        shape: ExecutionShape::SyncFunction,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hundred_jobs_each_picked_exactly_once_by_two_workers() {
    let mut registry = ProcessRegistry::new();
    registry.register(descriptor()).unwrap();

    let picked = Arc::new(Mutex::new(HashSet::new()));
    let mut bodies = ProcessBodyRegistry::new();
    bodies.register(
        "tag",
        ProcessBody::Sync(Arc::new(CountingEcho {
            picked: Arc::clone(&picked),
            ran: AtomicUsize::new(0),
        })),
    );

    let broker = Broker::new_in_memory(None);
    let result_backend: Arc<dyn ResultBackend> = Arc::new(InMemoryResultBackend::new());
    let engine = WorkerEngine::new(Arc::new(registry), Arc::new(bodies), broker.clone(), result_backend);

    let mut job_ids = Vec::new();
    for i in 0..100 {
        let job_id = format!("job-{i}");
        broker
            .create_job(job_id.clone(), "tag", vec![("JOB_ID".to_string(), serde_json::json!(job_id))], vec![])
            .await
            .unwrap();
        broker.enqueue_job(&job_id).await.unwrap();
        job_ids.push(job_id);
    }

    let worker_a = {
        let engine = engine.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                engine.run_once().await.unwrap();
            }
        })
    };
    let worker_b = {
        let engine = engine.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                engine.run_once().await.unwrap();
            }
        })
    };
    worker_a.await.unwrap();
    worker_b.await.unwrap();

    assert_eq!(picked.lock().unwrap().len(), 100, "every job must be picked exactly once");

    let mut succeeded = 0;
    for job_id in &job_ids {
        let job = broker.get_job(job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Succeeded, "job {job_id} did not succeed");
        succeeded += 1;
    }
    assert_eq!(succeeded, 100);
}
