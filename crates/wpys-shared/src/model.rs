//! # Data Model
//!
//! Process, Input, Output, Format, Domain and Job records, and the invariants
//! that govern their mutation. Every type here is a plain, serializable record;
//! the behavior that enforces the invariants lives in the registry, parser,
//! broker and worker crates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four execution shapes a process body may take.
///
/// The Worker pattern-matches on this tag exactly once per job and drives a
/// unified emission loop regardless of which shape the body actually is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionShape {
    SyncFunction,
    GeneratorStream,
    AsyncCoroutine,
    AsyncStream,
}

/// Static service-level metadata attached to a process, input or output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub references: Vec<String>,
}

/// A (mime-type, encoding, schema) tuple describing how bytes on the wire are
/// interpreted, plus optional size bound and value parser reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Format {
    pub mime_type: String,
    pub encoding: Option<String>,
    pub schema: Option<String>,
    pub maximum_megabytes: Option<u32>,
    /// Name of a registered value parser that overrides the descriptor's own,
    /// resolved by the input parser against a parser table supplied by the caller.
    pub value_parser: Option<String>,
}

impl Format {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            encoding: None,
            schema: None,
            maximum_megabytes: None,
            value_parser: None,
        }
    }
}

/// A (data_type, unit, allowed_values) tuple describing one permissible
/// representation of a literal value.
#[derive(Clone, Serialize, Deserialize)]
pub struct Domain {
    /// XSD type URI, e.g. `"xsd:double"`.
    pub data_type: String,
    pub allowed_values: Option<(f64, f64)>,
    pub unit_of_measurement: Option<String>,
    pub default_value: Option<String>,
    /// Converts a value expressed in this domain to the descriptor's default
    /// domain. Absent for the default domain itself.
    #[serde(skip)]
    pub to_default_domain: Option<Arc<dyn Fn(f64) -> f64 + Send + Sync>>,
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("data_type", &self.data_type)
            .field("allowed_values", &self.allowed_values)
            .field("unit_of_measurement", &self.unit_of_measurement)
            .field("default_value", &self.default_value)
            .field("to_default_domain", &self.to_default_domain.is_some())
            .finish()
    }
}

impl Domain {
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            allowed_values: None,
            unit_of_measurement: None,
            default_value: None,
            to_default_domain: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit_of_measurement = Some(unit.into());
        self
    }

    pub fn with_allowed_values(mut self, min: f64, max: f64) -> Self {
        self.allowed_values = Some((min, max));
        self
    }

    pub fn with_converter(mut self, f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        self.to_default_domain = Some(Arc::new(f));
        self
    }
}

/// The data-kind discriminated union shared by inputs and outputs.
#[derive(Clone, Serialize, Deserialize)]
pub enum DataKind {
    /// Non-empty ordered list of domains; the first is the default.
    Literal {
        domains: Vec<Domain>,
        /// Fallback parser name used when the resolved Format carries none.
        value_parser: Option<String>,
    },
    /// Non-empty ordered list of supported CRS tags.
    BoundingBox { supported_crs: Vec<String> },
    /// Formats alone suffice to describe a complex input/output.
    Complex,
}

impl std::fmt::Debug for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataKind::Literal { domains, value_parser } => f
                .debug_struct("Literal")
                .field("domains", domains)
                .field("value_parser", value_parser)
                .finish(),
            DataKind::BoundingBox { supported_crs } => f
                .debug_struct("BoundingBox")
                .field("supported_crs", supported_crs)
                .finish(),
            DataKind::Complex => f.write_str("Complex"),
        }
    }
}

/// Declares one named input or output slot of a process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub identifier: String,
    pub metadata: Metadata,
    /// Non-empty; the first is the default.
    pub formats: Vec<Format>,
    pub data_kind: DataKind,
}

/// Output slots share the same shape as inputs; kept as a distinct type so the
/// registry and parser never confuse the two.
pub type OutputDescriptor = InputDescriptor;

/// A named, immutable declaration of a computation.
///
/// Identifier collision on register is a programming error, not a runtime
/// error the registry recovers from.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub identifier: String,
    pub metadata: Metadata,
    pub inputs: Vec<InputDescriptor>,
    pub outputs: Vec<OutputDescriptor>,
    pub shape: ExecutionShape,
}

impl std::fmt::Debug for ProcessDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessDescriptor")
            .field("identifier", &self.identifier)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("shape", &self.shape)
            .finish()
    }
}

/// The status DAG a Job may move through.
///
/// Legal transitions: `Accepted -> Running -> {Succeeded, Failed, Dismissed}`,
/// `Accepted -> Dismissed`, `Running -> Paused -> Accepted`. Any other
/// transition is a broker-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Accepted,
    Running,
    Succeeded,
    Failed,
    Dismissed,
    Paused,
}

impl JobStatus {
    /// Whether `self -> next` is a legal edge in the status DAG.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Accepted, Running)
                | (Accepted, Dismissed)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Dismissed)
                | (Running, Paused)
                | (Paused, Accepted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Dismissed)
    }
}

/// Progress information reported while a Job is RUNNING.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusInfo {
    pub percent_completed: Option<u8>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub next_poll: Option<DateTime<Utc>>,
}

/// A reference to a produced output's bytes, kept out of Job state per the
/// result-backend hook: the Job holds a content identifier and size, never
/// the bytes themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultHandle {
    pub content_id: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// The terminal error attached to a FAILED job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub message: String,
    pub stack_trace: Option<String>,
}

/// A single invocation of a process with specific inputs.
///
/// Owned by the Broker for its entire lifetime; mutated only through Broker
/// operations. Workers never mutate Job state directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub process_id: String,
    /// Parsed, domain-canonicalized input values keyed by input identifier.
    pub inputs: Vec<(String, serde_json::Value)>,
    pub outputs: Vec<OutputDescriptor>,
    pub status: JobStatus,
    pub status_info: StatusInfo,
    pub results: std::collections::BTreeMap<String, ResultHandle>,
    pub error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        process_id: impl Into<String>,
        inputs: Vec<(String, serde_json::Value)>,
        outputs: Vec<OutputDescriptor>,
    ) -> Self {
        Self {
            id: id.into(),
            process_id: process_id.into(),
            inputs,
            outputs,
            status: JobStatus::Accepted,
            status_info: StatusInfo::default(),
            results: std::collections::BTreeMap::new(),
            error: None,
            created_at: Utc::now(),
            expires_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_dag_allows_documented_edges() {
        assert!(JobStatus::Accepted.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Accepted.can_transition_to(JobStatus::Dismissed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Succeeded));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Dismissed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Paused));
        assert!(JobStatus::Paused.can_transition_to(JobStatus::Accepted));
    }

    #[test]
    fn status_dag_rejects_everything_else() {
        assert!(!JobStatus::Succeeded.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Accepted.can_transition_to(JobStatus::Succeeded));
        assert!(!JobStatus::Dismissed.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Paused.can_transition_to(JobStatus::Running));
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Dismissed.is_terminal());
        assert!(!JobStatus::Accepted.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Paused.is_terminal());
    }

    #[test]
    fn new_job_starts_accepted_with_no_results() {
        let job = Job::new("job-1", "echo", vec![], vec![]);
        assert_eq!(job.status, JobStatus::Accepted);
        assert!(job.results.is_empty());
        assert!(job.error.is_none());
    }

    #[test]
    fn domain_converter_applies() {
        let feet = Domain::new("xsd:double")
            .with_unit("feet")
            .with_converter(|v| v * 0.3048);
        let f = feet.to_default_domain.as_ref().unwrap();
        assert!((f(10.0) - 3.048).abs() < 1e-9);
    }
}
