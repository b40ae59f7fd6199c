use std::path::{Path, PathBuf};

use chrono::Utc;
use heatlens_core::HeatlensError;
use heatlens_media::CombinedImage;
use tracing::debug;

/// Saves combined images as `combined_<timestamp>_<uuid8>.png`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn next_file_name() -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "combined_{}_{}.png",
            Utc::now().format("%Y%m%d%H%M%S"),
            &id[..8]
        )
    }

    /// Encode and write on a blocking thread; returns the saved path.
    pub async fn save(&self, image: CombinedImage) -> Result<PathBuf, HeatlensError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| HeatlensError::persistence(&self.dir, e))?;

        let path = self.dir.join(Self::next_file_name());
        let target = path.clone();
        tokio::task::spawn_blocking(move || image.save_png(&target))
            .await
            .map_err(|e| HeatlensError::Other(anyhow::anyhow!("image save task failed: {e}")))??;

        debug!(path = %path.display(), "Combined image saved");
        Ok(path)
    }
}
