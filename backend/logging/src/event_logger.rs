//! Workflow Event Logger
//!
//! Structured workflow events (analysis, batch flush, report written, stage
//! failure) emitted on the `workflow_events` tracing target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

/// Tracing target used for every workflow event.
pub const WORKFLOW_EVENTS_TARGET: &str = "workflow_events";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    ImageAnalyzed {
        image_path: String,
        structured: bool,
        pending: usize,
        capacity: usize,
    },
    BatchFlushed {
        images: usize,
    },
    ReportPersisted {
        path: String,
        images: usize,
    },
    StageFailed {
        stage: String,
        error_msg: String,
    },
}

impl WorkflowEvent {
    fn redacted(mut self) -> Self {
        if let WorkflowEvent::StageFailed { error_msg, .. } = &mut self {
            *error_msg = redact_sensitive_data(error_msg);
        }
        self
    }

    fn is_failure(&self) -> bool {
        matches!(self, WorkflowEvent::StageFailed { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub submission_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: WorkflowEvent,
}

impl EventLogEntry {
    pub fn new(submission_id: &str, event: WorkflowEvent) -> Self {
        Self {
            submission_id: submission_id.into(),
            timestamp: Utc::now(),
            event: event.redacted(),
        }
    }
}

pub struct WorkflowEventLogger;

impl WorkflowEventLogger {
    /// Logs a workflow event after redacting any free-form text.
    pub fn log_event(submission_id: &str, event: WorkflowEvent) {
        let entry = EventLogEntry::new(submission_id, event);
        let payload = serde_json::to_string(&entry).unwrap_or_default();

        if entry.event.is_failure() {
            warn!(target: WORKFLOW_EVENTS_TARGET, event = %payload, "Workflow event");
        } else {
            info!(target: WORKFLOW_EVENTS_TARGET, event = %payload, "Workflow event");
        }
    }
}
