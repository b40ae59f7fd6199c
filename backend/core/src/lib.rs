pub mod batch;
pub mod error;
pub mod report;
pub mod retry;
pub mod traits;

pub use batch::{split_sections, Batch, BatchEntry, ConsolidatedReport, SECTION_SEPARATOR};
pub use error::{HeatlensError, ImageRole};
pub use report::{
    AccessibilityAssessment, AttentionSummary, ImageRecommendations, PerImageReport, Severity,
    StrengthFinding, UsabilityReport, WcagLevel, WeaknessFinding,
};
pub use retry::{retry_async, RetryPolicy};
pub use traits::{InlineImage, LlmProvider, LlmRequest, LlmResponse};
