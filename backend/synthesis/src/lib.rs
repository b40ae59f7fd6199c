//! Batch report synthesis.
//!
//! A full batch goes through two strictly sequential LLM stages:
//! `ui_recommender` turns the per-image reports into a typed
//! [`RecommendationDraft`], and `report_compiler` turns that draft (and
//! nothing else) into the consolidated narrative.

pub mod draft;
pub mod prompt;
pub mod synthesizer;

pub use draft::RecommendationDraft;
pub use synthesizer::{ReportSynthesizer, StageRunner};
