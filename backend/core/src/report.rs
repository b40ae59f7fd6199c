//! Typed usability report records exchanged with the LLM services.
//!
//! The analyzer produces a [`PerImageReport`] for every combined image; the
//! recommender stage of the synthesis pipeline produces one
//! [`ImageRecommendations`] per image in a batch. Both are validated on
//! receipt so malformed model output is rejected instead of passed along.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Severity / WCAG level
// ---------------------------------------------------------------------------

/// Severity of a usability weakness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl FromStr for Severity {
    type Err = String;

    /// Models tend to prefix the level with a justification ("High, because
    /// ..."), so only the leading word is inspected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s
            .trim()
            .split(|c: char| !c.is_ascii_alphabetic())
            .find(|w| !w.is_empty())
            .unwrap_or("")
            .to_ascii_lowercase();
        match word.as_str() {
            "high" | "critical" | "severe" => Ok(Severity::High),
            "medium" | "moderate" => Ok(Severity::Medium),
            "low" | "minor" => Ok(Severity::Low),
            _ => Err(format!("unknown severity '{}'", s.trim())),
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => write!(f, "High"),
            Severity::Medium => write!(f, "Medium"),
            Severity::Low => write!(f, "Low"),
        }
    }
}

/// WCAG 2.1 conformance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WcagLevel {
    A,
    AA,
    AAA,
    NotConformant,
    /// The judgment names no level; the explanation carries it.
    Unspecified,
}

const NEGATIONS: &[&str] = &[
    "not", "non", "no", "never", "fail", "fails", "failing", "doesn", "isn", "lacks",
    "lacking", "below",
];
const CLAUSE_BREAKS: &[&str] = &[
    "but", "although", "though", "however", "except", "while", "whereas", "yet",
];
/// Words that, when negated, deny conformance without naming a level.
const CONFORMANCE_WORDS: &[&str] = &["conform", "complian", "complie", "accessib", "wcag"];

impl WcagLevel {
    /// Extract the conformance level claimed in free text.
    ///
    /// The highest level stated positively wins, so "meets AA but not AAA"
    /// is AA. `NotConformant` only when every mentioned level is negated.
    pub fn detect(text: &str) -> Self {
        let mut best = 0u8;
        let mut denied = false;

        for clause in text.split(|c: char| matches!(c, ',' | ';' | '.' | ':' | '\n' | '(' | ')')) {
            let words: Vec<&str> = clause
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|w| !w.is_empty())
                .collect();
            let mut negated = false;
            for (i, word) in words.iter().enumerate() {
                let lower = word.to_ascii_lowercase();
                if CLAUSE_BREAKS.contains(&lower.as_str()) {
                    negated = false;
                } else if NEGATIONS.contains(&lower.as_str()) {
                    negated = true;
                } else if let Some(rank) = level_rank(&words, i) {
                    if negated {
                        denied = true;
                    } else {
                        best = best.max(rank);
                    }
                } else if negated && CONFORMANCE_WORDS.iter().any(|p| lower.starts_with(p)) {
                    denied = true;
                }
            }
        }

        match best {
            3 => WcagLevel::AAA,
            2 => WcagLevel::AA,
            1 => WcagLevel::A,
            _ if denied => WcagLevel::NotConformant,
            _ => WcagLevel::Unspecified,
        }
    }
}

/// 1..=3 for A..AAA. A lone `A` is only a level when capitalised away from
/// the start of a clause ("A clear layout" is an article), or after
/// "level"/"wcag".
fn level_rank(words: &[&str], i: usize) -> Option<u8> {
    let word = words[i];
    match word.to_ascii_lowercase().as_str() {
        "aaa" => Some(3),
        "aa" => Some(2),
        "a" => {
            let after_marker = i > 0
                && matches!(words[i - 1].to_ascii_lowercase().as_str(), "level" | "wcag");
            let standalone = word == "A" && (i > 0 || words.len() == 1);
            (after_marker || standalone).then_some(1)
        }
        _ => None,
    }
}

impl fmt::Display for WcagLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WcagLevel::A => write!(f, "A"),
            WcagLevel::AA => write!(f, "AA"),
            WcagLevel::AAA => write!(f, "AAA"),
            WcagLevel::NotConformant => write!(f, "Not conformant"),
            WcagLevel::Unspecified => write!(f, "Unspecified"),
        }
    }
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthFinding {
    pub strength: String,
    #[serde(default)]
    pub heatmap_correlation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaknessFinding {
    pub weakness: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub heatmap_correlation: String,
    pub severity: Severity,
    #[serde(default)]
    pub impact: String,
    #[serde(default, alias = "recommendations")]
    pub recommendation: String,
}

/// Accessibility conformance judgment.
///
/// Accepts either `{"level": "AA", "explanation": "..."}` or a bare string
/// such as `"Meets WCAG 2.1 AA except ..."`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilityAssessment {
    pub level: WcagLevel,
    pub explanation: String,
}

impl<'de> Deserialize<'de> for AccessibilityAssessment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Object {
                level: String,
                #[serde(default)]
                explanation: String,
            },
        }

        let (level_text, explanation) = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => (text.clone(), text),
            Raw::Object { level, explanation } => (level, explanation),
        };
        Ok(Self {
            level: WcagLevel::detect(&level_text),
            explanation,
        })
    }
}

impl AccessibilityAssessment {
    /// `"AA: explanation"`, or just the explanation when no level was named.
    pub fn summary(&self) -> String {
        match self.level {
            WcagLevel::Unspecified => self.explanation.clone(),
            level => format!("{level}: {}", self.explanation),
        }
    }
}

/// Where gaze concentrated and where it did not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttentionSummary {
    #[serde(default)]
    pub high_attention: Vec<String>,
    #[serde(default)]
    pub low_attention: Vec<String>,
}

// ---------------------------------------------------------------------------
// Per-image analysis
// ---------------------------------------------------------------------------

/// Structured result of analyzing one combined UI + heatmap image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsabilityReport {
    #[serde(default)]
    pub attention: AttentionSummary,
    #[serde(default)]
    pub strengths: Vec<StrengthFinding>,
    #[serde(default)]
    pub weaknesses: Vec<WeaknessFinding>,
    #[serde(alias = "wcag_standards", alias = "wcag")]
    pub accessibility: AccessibilityAssessment,
}

impl UsabilityReport {
    pub fn validate(&self) -> Result<(), String> {
        if self.strengths.is_empty() && self.weaknesses.is_empty() {
            return Err("report lists neither strengths nor weaknesses".to_string());
        }
        if let Some(i) = self.strengths.iter().position(|s| s.strength.trim().is_empty()) {
            return Err(format!("strengths[{i}] is empty"));
        }
        if let Some(i) = self.weaknesses.iter().position(|w| w.weakness.trim().is_empty()) {
            return Err(format!("weaknesses[{i}] is empty"));
        }
        Ok(())
    }

    /// Markdown rendering used as LLM context and in logs.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        if !self.attention.high_attention.is_empty() || !self.attention.low_attention.is_empty() {
            out.push_str("### Attention\n");
            for area in &self.attention.high_attention {
                out.push_str(&format!("- High: {area}\n"));
            }
            for area in &self.attention.low_attention {
                out.push_str(&format!("- Low: {area}\n"));
            }
            out.push('\n');
        }
        out.push_str("### Strengths\n");
        for s in &self.strengths {
            out.push_str(&format!("- {}", s.strength));
            if !s.heatmap_correlation.is_empty() {
                out.push_str(&format!(" (heatmap: {})", s.heatmap_correlation));
            }
            out.push('\n');
        }
        out.push_str("\n### Weaknesses\n");
        for w in &self.weaknesses {
            out.push_str(&format!("- [{}] {}\n", w.severity, w.weakness));
            if !w.reason.is_empty() {
                out.push_str(&format!("  - Reason: {}\n", w.reason));
            }
            if !w.heatmap_correlation.is_empty() {
                out.push_str(&format!("  - Heatmap: {}\n", w.heatmap_correlation));
            }
            if !w.impact.is_empty() {
                out.push_str(&format!("  - Impact: {}\n", w.impact));
            }
            if !w.recommendation.is_empty() {
                out.push_str(&format!("  - Recommendation: {}\n", w.recommendation));
            }
        }
        out.push_str(&format!(
            "\n### Accessibility\nWCAG 2.1 {}\n",
            self.accessibility.summary()
        ));
        out
    }
}

/// What the analyzer hands to the batch: a validated structured report or
/// non-empty narrative text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum PerImageReport {
    Structured(UsabilityReport),
    Narrative(String),
}

impl PerImageReport {
    pub fn to_markdown(&self) -> String {
        match self {
            PerImageReport::Structured(report) => report.to_markdown(),
            PerImageReport::Narrative(text) => text.trim().to_string(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, PerImageReport::Structured(_))
    }
}

// ---------------------------------------------------------------------------
// Recommender stage output
// ---------------------------------------------------------------------------

/// Recommendations for one image of a batch, produced by the recommender stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecommendations {
    pub image_number: u32,
    #[serde(default)]
    pub strengths: Vec<StrengthFinding>,
    #[serde(default)]
    pub weaknesses: Vec<WeaknessFinding>,
    #[serde(alias = "wcag_standards", alias = "accessibility")]
    pub wcag: AccessibilityAssessment,
}

impl ImageRecommendations {
    pub fn to_markdown(&self) -> String {
        let mut out = format!("## Image {}\n\n#### Strengths\n", self.image_number);
        for s in &self.strengths {
            out.push_str(&format!("- **{}**", s.strength));
            if !s.heatmap_correlation.is_empty() {
                out.push_str(&format!(": {}", s.heatmap_correlation));
            }
            out.push('\n');
        }
        out.push_str("\n#### Weaknesses\n");
        for w in &self.weaknesses {
            out.push_str(&format!(
                "- **{}** (severity: {})\n  - Impact: {}\n  - Recommendation: {}\n",
                w.weakness, w.severity, w.impact, w.recommendation
            ));
        }
        out.push_str(&format!("\n#### WCAG 2.1\n{}\n", self.wcag.summary()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn severity_parses_leading_word() {
        assert_eq!("High".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(
            "medium - affects some users".parse::<Severity>().unwrap(),
            Severity::Medium
        );
        assert_eq!("Critical!".parse::<Severity>().unwrap(), Severity::High);
        assert!("unclear".parse::<Severity>().is_err());
    }

    #[test]
    fn wcag_level_detection() {
        assert_eq!(WcagLevel::detect("Meets WCAG 2.1 AA"), WcagLevel::AA);
        assert_eq!(WcagLevel::detect("AAA"), WcagLevel::AAA);
        assert_eq!(WcagLevel::detect("A"), WcagLevel::A);
        assert_eq!(WcagLevel::detect("Level A only"), WcagLevel::A);
        assert_eq!(WcagLevel::detect("meets level a"), WcagLevel::A);
        assert_eq!(
            WcagLevel::detect("Does not meet level AA"),
            WcagLevel::NotConformant
        );
        assert_eq!(WcagLevel::detect("Not conformant"), WcagLevel::NotConformant);
        assert_eq!(WcagLevel::detect("looks fine"), WcagLevel::Unspecified);
        assert_eq!(
            WcagLevel::detect("A clean layout with good contrast"),
            WcagLevel::Unspecified
        );
    }

    #[test]
    fn wcag_highest_positive_level_wins_over_negated_ones() {
        assert_eq!(
            WcagLevel::detect("Meets WCAG 2.1 AA, but does not meet AAA contrast requirements"),
            WcagLevel::AA
        );
        assert_eq!(
            WcagLevel::detect("Doesn't reach AA; only Level A is met"),
            WcagLevel::A
        );
        assert_eq!(
            WcagLevel::detect("Fails AA and fails AAA"),
            WcagLevel::NotConformant
        );
    }

    #[test]
    fn accessibility_without_level_keeps_explanation() {
        let parsed: AccessibilityAssessment =
            serde_json::from_value(json!("good contrast overall")).unwrap();
        assert_eq!(parsed.level, WcagLevel::Unspecified);
        assert_eq!(parsed.summary(), "good contrast overall");

        let report: UsabilityReport = serde_json::from_value(json!({
            "strengths": [{"strength": "Readable body text"}],
            "wcag_standards": "good contrast overall"
        }))
        .unwrap();
        assert!(report.to_markdown().contains("WCAG 2.1 good contrast overall"));
    }

    #[test]
    fn mixed_judgment_renders_positive_level() {
        let parsed: AccessibilityAssessment = serde_json::from_value(json!(
            "Meets WCAG 2.1 AA, but does not meet AAA contrast requirements"
        ))
        .unwrap();
        assert!(parsed.summary().starts_with("AA: Meets"));
    }

    #[test]
    fn accessibility_accepts_string_or_object() {
        let from_text: AccessibilityAssessment =
            serde_json::from_value(json!("Conforms to AA; contrast is 4.6:1")).unwrap();
        assert_eq!(from_text.level, WcagLevel::AA);
        assert!(from_text.explanation.contains("4.6:1"));

        let from_object: AccessibilityAssessment =
            serde_json::from_value(json!({"level": "AAA", "explanation": "all good"})).unwrap();
        assert_eq!(from_object.level, WcagLevel::AAA);
    }

    #[test]
    fn usability_report_from_model_json() {
        let value = json!({
            "attention": {"high_attention": ["hero image"], "low_attention": ["footer"]},
            "strengths": [{"strength": "Clear hero", "heatmap_correlation": "dense fixations"}],
            "weaknesses": [{
                "weakness": "Low contrast CTA",
                "reason": "Violates visibility heuristic",
                "severity": "High because it blocks conversion",
                "impact": "Missed clicks",
                "recommendations": "Raise contrast to 4.5:1"
            }],
            "wcag_standards": "Partially meets A"
        });
        let report: UsabilityReport = serde_json::from_value(value).unwrap();
        assert!(report.validate().is_ok());
        assert_eq!(report.weaknesses[0].severity, Severity::High);
        assert_eq!(report.weaknesses[0].recommendation, "Raise contrast to 4.5:1");
        assert_eq!(report.accessibility.level, WcagLevel::A);

        let md = report.to_markdown();
        assert!(md.contains("- High: hero image"));
        assert!(md.contains("[High] Low contrast CTA"));
    }

    #[test]
    fn empty_report_fails_validation() {
        let report = UsabilityReport {
            attention: AttentionSummary::default(),
            strengths: vec![],
            weaknesses: vec![],
            accessibility: AccessibilityAssessment {
                level: WcagLevel::AA,
                explanation: String::new(),
            },
        };
        assert!(report.validate().is_err());
    }

    #[test]
    fn narrative_report_renders_trimmed() {
        let report = PerImageReport::Narrative("  users looked at the logo \n".into());
        assert_eq!(report.to_markdown(), "users looked at the logo");
        assert!(!report.is_structured());
    }
}
