use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use heatlens_config::HeatlensConfig;
use heatlens_core::{Batch, BatchEntry, ConsolidatedReport, HeatlensError};
use heatlens_logging::{WorkflowEvent, WorkflowEventLogger};
use heatlens_media::CombinedImage;
use heatlens_providers::ProviderRegistry;
use heatlens_synthesis::ReportSynthesizer;
use heatlens_understanding::ImageAnalyzer;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::{BatchAccumulator, BatchState, ImageStore, ReportPersister};

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Submission {
    /// Analysis stored; the batch is still filling.
    Accumulated { count: usize, capacity: usize },
    /// This submission completed a batch and its report was written.
    ReportWritten { path: PathBuf, images: usize },
}

/// The most recent consolidated report.
#[derive(Debug, Clone)]
pub struct LatestReport {
    pub path: PathBuf,
    pub text: String,
}

/// Composite → analyze → save → append, and on a full batch
/// synthesize → persist.
pub struct UsabilityWorkflow {
    analyzer: ImageAnalyzer,
    accumulator: BatchAccumulator,
    images: ImageStore,
    reports: Arc<ReportStage>,
}

/// Turns a taken batch into a report on disk. Shared with the task that
/// finishes each full batch.
struct ReportStage {
    synthesizer: ReportSynthesizer,
    persister: ReportPersister,
    latest: RwLock<Option<LatestReport>>,
}

fn stage_failed(submission_id: &str, stage: &str, err: HeatlensError) -> HeatlensError {
    WorkflowEventLogger::log_event(
        submission_id,
        WorkflowEvent::StageFailed {
            stage: stage.to_string(),
            error_msg: err.to_string(),
        },
    );
    err
}

impl UsabilityWorkflow {
    pub fn new(
        analyzer: ImageAnalyzer,
        synthesizer: ReportSynthesizer,
        accumulator: BatchAccumulator,
        images: ImageStore,
        persister: ReportPersister,
    ) -> Self {
        Self {
            analyzer,
            accumulator,
            images,
            reports: Arc::new(ReportStage {
                synthesizer,
                persister,
                latest: RwLock::new(None),
            }),
        }
    }

    pub fn from_config(config: &HeatlensConfig, registry: &ProviderRegistry) -> Result<Self> {
        Ok(Self::new(
            ImageAnalyzer::from_config(config, registry)?,
            ReportSynthesizer::from_config(config, registry)?,
            BatchAccumulator::new(config.batch_size())?,
            ImageStore::new(config.images_dir()),
            ReportPersister::new(config.output_dir()).with_inline_images(config.inline_images()),
        ))
    }

    pub fn capacity(&self) -> usize {
        self.accumulator.capacity()
    }

    pub async fn pending(&self) -> usize {
        self.accumulator.len().await
    }

    pub fn output_dir(&self) -> &Path {
        self.reports.persister.output_dir()
    }

    /// Process one (UI screenshot, heatmap) pair.
    ///
    /// Nothing is appended unless compositing, analysis and the image save
    /// all succeed. Once a batch has been taken it is never re-queued: if
    /// synthesis or persistence fails the batch is dropped and the error
    /// returned. A taken batch is finished on its own task, so it still
    /// reaches disk when the caller stops waiting.
    pub async fn submit(
        &self,
        ui_bytes: Vec<u8>,
        heatmap_bytes: Vec<u8>,
    ) -> Result<Submission, HeatlensError> {
        let submission_id = uuid::Uuid::new_v4().to_string();
        let fail = |stage: &str, err: HeatlensError| stage_failed(&submission_id, stage, err);

        let combined = tokio::task::spawn_blocking(move || {
            CombinedImage::from_uploads(&ui_bytes, &heatmap_bytes)
        })
        .await
        .map_err(|e| HeatlensError::Other(anyhow::anyhow!("composite task failed: {e}")))
        .and_then(|r| r)
        .map_err(|e| fail("composite", e))?;

        let report = self
            .analyzer
            .analyze(&combined)
            .await
            .map_err(|e| fail("analyzer", e))?;
        let structured = report.is_structured();

        let image_path = self
            .images
            .save(combined)
            .await
            .map_err(|e| fail("image_store", e))?;

        let state = self
            .accumulator
            .append(BatchEntry::new(report, &image_path))
            .await;

        let pending = match &state {
            BatchState::Partial(count) => *count,
            BatchState::Full(_) => 0,
        };
        WorkflowEventLogger::log_event(
            &submission_id,
            WorkflowEvent::ImageAnalyzed {
                image_path: image_path.display().to_string(),
                structured,
                pending,
                capacity: self.capacity(),
            },
        );

        let batch = match state {
            BatchState::Partial(count) => {
                return Ok(Submission::Accumulated {
                    count,
                    capacity: self.capacity(),
                })
            }
            BatchState::Full(batch) => batch,
        };

        let reports = self.reports.clone();
        tokio::spawn(async move { reports.complete(&submission_id, batch).await })
            .await
            .map_err(|e| HeatlensError::Other(anyhow::anyhow!("report task failed: {e}")))?
    }

    /// Last report written by this process, else the newest one on disk.
    pub async fn latest_report(&self) -> Option<LatestReport> {
        if let Some(latest) = self.reports.latest.read().await.clone() {
            return Some(latest);
        }
        let path = self.reports.persister.latest_on_disk().await?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                info!(path = %path.display(), "Loaded latest report from disk");
                Some(LatestReport { path, text })
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read latest report");
                None
            }
        }
    }
}

impl ReportStage {
    async fn complete(&self, submission_id: &str, batch: Batch) -> Result<Submission, HeatlensError> {
        WorkflowEventLogger::log_event(
            submission_id,
            WorkflowEvent::BatchFlushed {
                images: batch.len(),
            },
        );
        let image_paths: Vec<PathBuf> = batch
            .image_paths()
            .into_iter()
            .map(Path::to_path_buf)
            .collect();

        let report = match self.synthesizer.synthesize(&batch).await {
            Ok(report) => report,
            Err(err) => {
                error!(images = ?image_paths, error = %err, "Synthesis failed; batch dropped");
                return Err(stage_failed(submission_id, "synthesis", err));
            }
        };

        let path = match self.persister.persist(&report, &image_paths).await {
            Ok(path) => path,
            Err(err) => {
                error!(images = ?image_paths, error = %err, "Persisting report failed; batch dropped");
                return Err(stage_failed(submission_id, "persist", err));
            }
        };

        WorkflowEventLogger::log_event(
            submission_id,
            WorkflowEvent::ReportPersisted {
                path: path.display().to_string(),
                images: image_paths.len(),
            },
        );
        self.remember(&path, &report).await;

        Ok(Submission::ReportWritten {
            path,
            images: image_paths.len(),
        })
    }

    async fn remember(&self, path: &Path, report: &ConsolidatedReport) {
        *self.latest.write().await = Some(LatestReport {
            path: path.to_path_buf(),
            text: report.text.clone(),
        });
    }
}
