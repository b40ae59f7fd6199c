//! `heatlens blend`: compositor only, no model calls.

use std::path::Path;

use anyhow::{Context, Result};
use heatlens_media::CombinedImage;

pub async fn run(ui: &Path, heatmap: &Path, out: &Path) -> Result<()> {
    let ui_bytes = tokio::fs::read(ui)
        .await
        .with_context(|| format!("Failed to read UI screenshot: {}", ui.display()))?;
    let heatmap_bytes = tokio::fs::read(heatmap)
        .await
        .with_context(|| format!("Failed to read heatmap: {}", heatmap.display()))?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let out_path = out.to_path_buf();
    let (width, height) = tokio::task::spawn_blocking(move || {
        let combined = CombinedImage::from_uploads(&ui_bytes, &heatmap_bytes)?;
        combined.save_png(&out_path)?;
        anyhow::Ok(combined.dimensions())
    })
    .await??;

    println!("Wrote {}x{} image to {}", width, height, out.display());
    Ok(())
}
