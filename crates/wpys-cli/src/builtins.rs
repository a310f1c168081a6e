//! # Built-in Processes
//!
//! A tiny static table standing in for the dynamic `module:name` import the
//! config format describes: Rust has no idiomatic equivalent of importing an
//! arbitrary dotted path at startup, so `process_config.locations` entries
//! are resolved against this table instead. Real deployments embed
//! `wpys-worker` as a library and register their own bodies directly; this
//! table exists so `wpys-cli worker` has something runnable out of the box.

use std::sync::Arc;

use wpys_shared::errors::WpysResult;
use wpys_shared::model::{DataKind, Domain, ExecutionShape, Format, InputDescriptor, Metadata, ProcessDescriptor};
use wpys_shared::registry::ProcessRegistry;
use wpys_worker::{BlockingProcessBody, Emitter, ProcessBody, ProcessBodyRegistry, ResultEmission, StatusDelta};

struct Echo;

impl BlockingProcessBody for Echo {
    fn run(&self, inputs: &[(String, serde_json::Value)], emitter: Emitter) -> WpysResult<()> {
        let (_, value) = &inputs[0];
        emitter.emit_status(StatusDelta {
            percent_completed: Some(100),
            ..Default::default()
        });
        emitter.emit_result(ResultEmission {
            output_identifier: Some("RESULT".to_string()),
            bytes: serde_json::to_vec(value).unwrap_or_default(),
            mime_type: "application/json".to_string(),
        });
        Ok(())
    }
}

fn echo_descriptor() -> ProcessDescriptor {
    ProcessDescriptor {
        identifier: "echo".to_string(),
        metadata: Metadata {
            title: Some("Echo".to_string()),
            abstract_text: Some("Returns its input unchanged".to_string()),
            ..Metadata::default()
        },
        inputs: vec![InputDescriptor {
            identifier: "VALUE".to_string(),
            metadata: Metadata::default(),
            formats: vec![Format::new("application/json")],
            data_kind: DataKind::Complex,
        }],
        outputs: vec![InputDescriptor {
            identifier: "RESULT".to_string(),
            metadata: Metadata::default(),
            formats: vec![Format::new("application/json")],
            data_kind: DataKind::Complex,
        }],
        shape: ExecutionShape::SyncFunction,
    }
}

struct Square;

impl BlockingProcessBody for Square {
    fn run(&self, inputs: &[(String, serde_json::Value)], emitter: Emitter) -> WpysResult<()> {
        let value = inputs[0].1.as_f64().unwrap_or(0.0);
        emitter.emit_status(StatusDelta {
            percent_completed: Some(100),
            ..Default::default()
        });
        emitter.emit_result(ResultEmission {
            output_identifier: Some("RESULT".to_string()),
            bytes: serde_json::to_vec(&serde_json::json!(value * value)).unwrap_or_default(),
            mime_type: "application/json".to_string(),
        });
        Ok(())
    }
}

fn square_descriptor() -> ProcessDescriptor {
    ProcessDescriptor {
        identifier: "square".to_string(),
        metadata: Metadata {
            title: Some("Square".to_string()),
            abstract_text: Some("Squares a double-precision literal input".to_string()),
            ..Metadata::default()
        },
        inputs: vec![InputDescriptor {
            identifier: "VALUE".to_string(),
            metadata: Metadata::default(),
            formats: vec![Format::new("text/plain")],
            data_kind: DataKind::Literal {
                domains: vec![Domain::new("xsd:double")],
                value_parser: None,
            },
        }],
        outputs: vec![InputDescriptor {
            identifier: "RESULT".to_string(),
            metadata: Metadata::default(),
            formats: vec![Format::new("application/json")],
            data_kind: DataKind::Complex,
        }],
        shape: ExecutionShape::SyncFunction,
    }
}

/// Resolves each `module:name` location against the built-in table,
/// registering a matching descriptor and body. Locations that don't resolve
/// are logged and skipped rather than treated as a startup failure — an
/// unknown process is a deployment's own affair, not an engine defect.
pub fn register_all(registry: &mut ProcessRegistry, bodies: &mut ProcessBodyRegistry, locations: &[String]) -> WpysResult<()> {
    for location in locations {
        let name = location.split_once(':').map(|(_, name)| name).unwrap_or(location.as_str());
        match name {
            "echo" => {
                registry.register(echo_descriptor())?;
                bodies.register("echo", ProcessBody::Sync(Arc::new(Echo)));
            }
            "square" => {
                registry.register(square_descriptor())?;
                bodies.register("square", ProcessBody::Sync(Arc::new(Square)));
            }
            other => tracing::warn!(location = %location, "no built-in process for {other:?}, skipping"),
        }
    }
    Ok(())
}
