//! Control-channel message vocabulary.

use serde::{Deserialize, Serialize};

/// Lifecycle messages published on a job's per-job control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    Dismiss,
    Succeeded,
    Failed,
    Paused,
}

impl ControlKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlKind::Dismiss => "dismiss",
            ControlKind::Succeeded => "succeeded",
            ControlKind::Failed => "failed",
            ControlKind::Paused => "paused",
        }
    }
}
