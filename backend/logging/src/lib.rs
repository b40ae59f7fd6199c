//! Structured logging for heatlens.
//!
//! Handles log redaction, console and rolling NDJSON file output, and
//! workflow event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, WorkflowEvent, WorkflowEventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
