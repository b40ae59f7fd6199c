//! Prompts for the two synthesis stages.

use heatlens_core::{Batch, SECTION_SEPARATOR};

use crate::RecommendationDraft;

pub const RECOMMENDER_SYSTEM_PROMPT: &str = "You are a senior UI/UX consultant. You turn \
eye-tracking usability analyses into prioritized, actionable recommendations grounded in \
Nielsen's heuristics, Gestalt principles and WCAG 2.1.";

pub const COMPILER_SYSTEM_PROMPT: &str = "You are a technical writer who compiles usability \
findings into a cohesive, well-structured markdown report for product teams.";

/// Recommender input: every per-image report of the batch, in order.
pub fn recommender_prompt(batch: &Batch) -> String {
    let mut out = format!(
        "Below are usability analyses of {} user-interface screenshots overlaid with \
eye-tracking heatmaps, numbered in submission order.\n\n",
        batch.len()
    );
    for (i, report) in batch.reports().enumerate() {
        if i > 0 {
            out.push_str(&format!("\n{SECTION_SEPARATOR}\n\n"));
        }
        out.push_str(&format!("# Image {}\n\n{}\n", i + 1, report.to_markdown()));
    }
    out.push_str(&format!(
        r#"
For each image produce 3-4 strengths and 3-4 weaknesses. Respond with one JSON object
and nothing else:
{{"images": [{{
  "image_number": 1,
  "strengths": [{{"strength": "...", "heatmap_correlation": "..."}}],
  "weaknesses": [{{"weakness": "...", "reason": "...", "heatmap_correlation": "...",
                  "severity": "High|Medium|Low", "impact": "...", "recommendation": "..."}}],
  "wcag": {{"level": "A|AA|AAA|Not conformant", "explanation": "..."}}
}}]}}
The "images" array must contain exactly {} entries, numbered 1 to {}."#,
        batch.len(),
        batch.len()
    ));
    out
}

/// Compiler input: the rendered recommendation draft only.
pub fn compiler_prompt(draft: &RecommendationDraft) -> String {
    format!(
        "Compile the following per-image recommendations into one usability report.\n\
Keep exactly one section per image, in the same order, and separate sections with a line \
containing only `{sep}`. Do not add a separator before the first or after the last section. \
Preserve every severity rating and WCAG level.\n\n{sep}\n\n{body}\n",
        sep = SECTION_SEPARATOR,
        body = draft.render()
    )
}
