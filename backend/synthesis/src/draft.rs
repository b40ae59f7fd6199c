use anyhow::{bail, Context, Result};
use heatlens_core::{ImageRecommendations, SECTION_SEPARATOR};
use heatlens_understanding::extract_json;
use serde::{Deserialize, Serialize};

/// Output of the `ui_recommender` stage: one validated entry per batch image,
/// ordered by image number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationDraft {
    images: Vec<ImageRecommendations>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDraft {
    Wrapped { images: Vec<ImageRecommendations> },
    Bare(Vec<ImageRecommendations>),
    Single(ImageRecommendations),
}

impl RecommendationDraft {
    /// Build a draft, checking it covers images `1..=expected_images` exactly once.
    pub fn new(mut images: Vec<ImageRecommendations>, expected_images: usize) -> Result<Self> {
        if images.len() != expected_images {
            bail!(
                "expected recommendations for {expected_images} image(s), got {}",
                images.len()
            );
        }
        images.sort_by_key(|r| r.image_number);
        for (i, rec) in images.iter().enumerate() {
            let expected = i as u32 + 1;
            if rec.image_number != expected {
                bail!(
                    "image numbers must run 1..={expected_images}; found {} at position {expected}",
                    rec.image_number
                );
            }
        }
        Ok(Self { images })
    }

    /// Parse a recommender reply: `{"images": [...]}`, a bare array, or (for
    /// single-image batches) one object, optionally inside a fenced block.
    pub fn parse(text: &str, expected_images: usize) -> Result<Self> {
        let json = extract_json(text).context("recommender reply contains no JSON")?;
        let raw: RawDraft =
            serde_json::from_str(json).context("recommender JSON does not match schema")?;
        let images = match raw {
            RawDraft::Wrapped { images } | RawDraft::Bare(images) => images,
            RawDraft::Single(image) => vec![image],
        };
        Self::new(images, expected_images)
    }

    pub fn images(&self) -> &[ImageRecommendations] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Markdown with a `---` line between images; the compiler's only input.
    pub fn render(&self) -> String {
        self.images
            .iter()
            .map(|r| r.to_markdown().trim_end().to_string())
            .collect::<Vec<_>>()
            .join(&format!("\n\n{SECTION_SEPARATOR}\n\n"))
    }
}
