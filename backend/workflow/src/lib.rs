//! The heatlens submission workflow.
//!
//! Each submission is composited, analyzed and saved before it is appended
//! to the shared [`BatchAccumulator`]; the append that fills the batch
//! triggers synthesis and persistence of one consolidated report.

pub mod accumulator;
pub mod image_store;
pub mod persister;
pub mod workflow;

pub use accumulator::{BatchAccumulator, BatchState};
pub use image_store::ImageStore;
pub use persister::ReportPersister;
pub use workflow::{LatestReport, Submission, UsabilityWorkflow};
