//! Writes consolidated reports as markdown files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use heatlens_core::{ConsolidatedReport, HeatlensError};
use heatlens_media::detect_mime_type;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

pub const REPORT_FILE_PREFIX: &str = "ui_analysis_";

/// Suffixes tried after the plain name before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Persists reports into one output directory. Report names never collide:
/// an existing name gets a `_2`, `_3`, ... suffix instead of being replaced.
#[derive(Debug, Clone)]
pub struct ReportPersister {
    output_dir: PathBuf,
    inline_images: bool,
}

impl ReportPersister {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            inline_images: false,
        }
    }

    /// Embed images as base64 data URIs instead of relative links.
    pub fn with_inline_images(mut self, inline: bool) -> Self {
        self.inline_images = inline;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `ui_analysis_<YYYYMMDDHHMMSS>.md`, or `..._<n>.md` for attempt `n > 1`.
    pub fn file_name(created_at: DateTime<Utc>, attempt: u32) -> String {
        let stamp = created_at.format("%Y%m%d%H%M%S");
        if attempt <= 1 {
            format!("{REPORT_FILE_PREFIX}{stamp}.md")
        } else {
            format!("{REPORT_FILE_PREFIX}{stamp}_{attempt}.md")
        }
    }

    /// Markdown link target for an image: relative to the output directory
    /// when possible.
    pub fn image_link(&self, image: &Path) -> String {
        let relative = image.strip_prefix(&self.output_dir).unwrap_or(image);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    async fn image_target(&self, image: &Path) -> Result<String, HeatlensError> {
        if !self.inline_images {
            return Ok(self.image_link(image));
        }
        let bytes = fs::read(image)
            .await
            .map_err(|e| HeatlensError::persistence(image, e))?;
        Ok(format!(
            "data:{};base64,{}",
            detect_mime_type(image),
            STANDARD.encode(bytes)
        ))
    }

    /// Pair section `i` with image `i`. Extra sections are written without an
    /// image; extra images are embedded after an empty section.
    pub async fn render(
        &self,
        report: &ConsolidatedReport,
        images: &[PathBuf],
    ) -> Result<String, HeatlensError> {
        let sections = report.sections();
        if sections.len() != images.len() {
            warn!(
                sections = sections.len(),
                images = images.len(),
                "Report sections and images differ in count"
            );
        }

        let mut blocks = Vec::new();
        for i in 0..sections.len().max(images.len()) {
            let mut block = sections.get(i).copied().unwrap_or_default().to_string();
            if let Some(image) = images.get(i) {
                let target = self.image_target(image).await?;
                if !block.is_empty() {
                    block.push_str("\n\n");
                }
                block.push_str(&format!("![Image {}]({target})", i + 1));
            }
            blocks.push(block);
        }
        Ok(blocks.join("\n\n---\n\n") + "\n")
    }

    /// Render and write the report with create-new semantics; returns the
    /// path actually written.
    pub async fn persist(
        &self,
        report: &ConsolidatedReport,
        images: &[PathBuf],
    ) -> Result<PathBuf, HeatlensError> {
        let content = self.render(report, images).await?;
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| HeatlensError::persistence(&self.output_dir, e))?;

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let path = self
                .output_dir
                .join(Self::file_name(report.created_at, attempt));
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(HeatlensError::persistence(&path, e)),
            };

            write_or_remove(&path, &mut file, content.as_bytes()).await?;
            info!(path = %path.display(), images = images.len(), "Report persisted");
            return Ok(path);
        }

        Err(HeatlensError::persistence(
            &self.output_dir,
            format!("no free report name after {MAX_NAME_ATTEMPTS} attempts"),
        ))
    }

    /// Newest report file in the output directory, if any.
    pub async fn latest_on_disk(&self) -> Option<PathBuf> {
        let mut dir = fs::read_dir(&self.output_dir).await.ok()?;
        let mut newest: Option<(DateTime<Utc>, u32, PathBuf)> = None;
        while let Ok(Some(entry)) = dir.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(key) = parse_report_name(&name) else {
                continue;
            };
            if newest.as_ref().map_or(true, |(t, n, _)| key > (*t, *n)) {
                newest = Some((key.0, key.1, entry.path()));
            }
        }
        newest.map(|(_, _, path)| path)
    }
}

/// Write and flush `content`; a file that could not be written completely
/// is removed so it never shows up as a report.
async fn write_or_remove<W>(path: &Path, out: &mut W, content: &[u8]) -> Result<(), HeatlensError>
where
    W: AsyncWrite + Unpin,
{
    let written = match out.write_all(content).await {
        Ok(()) => out.flush().await,
        Err(e) => Err(e),
    };
    let Err(e) = written else {
        return Ok(());
    };
    if let Err(remove_err) = fs::remove_file(path).await {
        warn!(path = %path.display(), error = %remove_err, "Failed to remove partial report");
    }
    Err(HeatlensError::persistence(path, e))
}

/// `(timestamp, attempt)` for a report file name.
fn parse_report_name(name: &str) -> Option<(DateTime<Utc>, u32)> {
    let stem = name.strip_prefix(REPORT_FILE_PREFIX)?.strip_suffix(".md")?;
    let (stamp, attempt) = match stem.split_once('_') {
        Some((stamp, n)) => (stamp, n.parse().ok()?),
        None => (stem, 1),
    };
    let naive = chrono::NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()?;
    Some((naive.and_utc(), attempt))
}
