//! Single-image usability analysis: sends a combined UI + heatmap image to a
//! vision LLM and turns the reply into a [`heatlens_core::PerImageReport`].

pub mod analyzer;
pub mod parse;
pub mod prompt;

pub use analyzer::{AnalyzerSettings, ImageAnalyzer};
pub use parse::{extract_json, parse_analysis};
