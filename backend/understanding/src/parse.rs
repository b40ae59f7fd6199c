//! Turning raw model text into a validated per-image report.

use anyhow::{Result, bail};
use heatlens_core::{PerImageReport, UsabilityReport};
use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").unwrap());

/// Find the JSON payload in a model reply: either a fenced code block
/// whose body is JSON, or the whole reply when it starts with `{` or `[`.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(body) = FENCED_BLOCK
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
    {
        if body.starts_with('{') || body.starts_with('[') {
            return Some(body);
        }
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }
    None
}

/// Parse an analyzer reply.
///
/// JSON must deserialize into a [`UsabilityReport`] and pass validation.
/// Free text is kept as a narrative report unless `require_structured`.
pub fn parse_analysis(text: &str, require_structured: bool) -> Result<PerImageReport> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        bail!("empty response");
    }

    match extract_json(trimmed) {
        Some(json) => {
            let report: UsabilityReport = match serde_json::from_str(json) {
                Ok(report) => report,
                Err(e) => bail!("malformed analysis JSON: {e}"),
            };
            if let Err(reason) = report.validate() {
                bail!("invalid analysis: {reason}");
            }
            Ok(PerImageReport::Structured(report))
        }
        None if require_structured => bail!("expected a JSON report but got free text"),
        None => Ok(PerImageReport::Narrative(trimmed.to_string())),
    }
}
