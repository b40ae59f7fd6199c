//! `heatlens analyze`: one pair through the full pipeline as a batch of one.

use std::path::Path;

use anyhow::{Context, Result};
use heatlens_providers::ProviderRegistry;
use heatlens_workflow::{Submission, UsabilityWorkflow};
use tracing::info;

pub async fn run(config_path: &Path, ui: &Path, heatmap: &Path) -> Result<()> {
    let mut config = heatlens_config::load(config_path).await?;
    config.batch.get_or_insert_with(Default::default).size = Some(1);
    crate::init_logging(&config)?;
    let config = heatlens_config::prepare(config)?;

    let registry = ProviderRegistry::from_config(&config)?;
    let workflow = UsabilityWorkflow::from_config(&config, &registry)?;

    let ui_bytes = tokio::fs::read(ui)
        .await
        .with_context(|| format!("Failed to read UI screenshot: {}", ui.display()))?;
    let heatmap_bytes = tokio::fs::read(heatmap)
        .await
        .with_context(|| format!("Failed to read heatmap: {}", heatmap.display()))?;

    info!(ui = %ui.display(), heatmap = %heatmap.display(), "Analyzing pair");
    match workflow.submit(ui_bytes, heatmap_bytes).await? {
        Submission::ReportWritten { path, .. } => {
            println!("Report written to {}", path.display());
        }
        Submission::Accumulated { count, capacity } => {
            println!("Analysis stored ({count}/{capacity}); no report yet");
        }
    }
    Ok(())
}
