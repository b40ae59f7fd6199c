use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::PerImageReport;

/// Literal line that separates per-image sections in synthesized reports.
pub const SECTION_SEPARATOR: &str = "---";

/// One analyzed image waiting in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub report: PerImageReport,
    /// Where the combined image was saved.
    pub image_path: PathBuf,
    pub analyzed_at: DateTime<Utc>,
}

impl BatchEntry {
    pub fn new(report: PerImageReport, image_path: impl Into<PathBuf>) -> Self {
        Self {
            report,
            image_path: image_path.into(),
            analyzed_at: Utc::now(),
        }
    }
}

/// A completed batch, in insertion order. Entry `i` is "image i+1" in the
/// consolidated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn new(entries: Vec<BatchEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reports(&self) -> impl Iterator<Item = &PerImageReport> {
        self.entries.iter().map(|e| &e.report)
    }

    pub fn image_paths(&self) -> Vec<&Path> {
        self.entries.iter().map(|e| e.image_path.as_path()).collect()
    }
}

/// Synthesized narrative for a whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedReport {
    pub text: String,
    pub image_count: usize,
    pub created_at: DateTime<Utc>,
}

impl ConsolidatedReport {
    pub fn new(text: impl Into<String>, image_count: usize) -> Self {
        Self {
            text: text.into(),
            image_count,
            created_at: Utc::now(),
        }
    }

    /// Split on separator lines, dropping sections that are blank.
    pub fn sections(&self) -> Vec<&str> {
        split_sections(&self.text)
    }
}

/// Split text on lines consisting solely of [`SECTION_SEPARATOR`].
pub fn split_sections(text: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim() == SECTION_SEPARATOR {
            sections.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    sections.push(&text[start..]);

    sections
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_split_on_separator_lines_only() {
        let report = ConsolidatedReport::new(
            "## Image 1\nfine\n---\n## Image 2\nuses a -- dash\n\n---\n## Image 3\nok\n",
            3,
        );
        let sections = report.sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0], "## Image 1\nfine");
        assert!(sections[1].contains("-- dash"));
        assert_eq!(sections[2], "## Image 3\nok");
    }

    #[test]
    fn blank_sections_are_dropped() {
        let sections = split_sections("---\nonly one\n---\n\n---");
        assert_eq!(sections, vec!["only one"]);
    }

    #[test]
    fn batch_preserves_insertion_order() {
        let batch = Batch::new(vec![
            BatchEntry::new(PerImageReport::Narrative("one".into()), "images/a.png"),
            BatchEntry::new(PerImageReport::Narrative("two".into()), "images/b.png"),
        ]);
        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.image_paths(),
            vec![Path::new("images/a.png"), Path::new("images/b.png")]
        );
        let texts: Vec<_> = batch.reports().map(|r| r.to_markdown()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }
}
