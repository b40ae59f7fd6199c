//! Prompts for the single-image analyzer.

pub const ANALYZER_SYSTEM_PROMPT: &str = "You are a UI/UX analyst. You are shown a user \
interface screenshot with an eye-tracking heatmap blended over it. Warm, opaque regions \
received the most gaze; cool or clear regions received little or none.";

/// Instructions and response shape for one combined image.
pub const ANALYZER_USER_PROMPT: &str = r#"Analyze the attached image.

1. Identify the areas of high and low visual attention.
2. Correlate them with usability heuristics (visibility, hierarchy, consistency,
   affordance) and accessibility concerns (contrast, text size, focus order).
3. List strengths and weaknesses. Every weakness needs a reason, its heatmap
   correlation, a severity (High, Medium or Low), the impact on users and a
   concrete recommendation.
4. Judge WCAG 2.1 conformance (A, AA, AAA or not conformant) with an explanation.

Respond with a single JSON object of this shape and nothing else:
{
  "attention": { "high_attention": ["..."], "low_attention": ["..."] },
  "strengths": [ { "strength": "...", "heatmap_correlation": "..." } ],
  "weaknesses": [ {
    "weakness": "...",
    "reason": "...",
    "heatmap_correlation": "...",
    "severity": "High",
    "impact": "...",
    "recommendation": "..."
  } ],
  "accessibility": { "level": "AA", "explanation": "..." }
}"#;
