use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use heatlens_core::{HeatlensError, ImageRole, InlineImage};
use image::{ImageFormat, RgbaImage};

use crate::composite;

/// A UI screenshot with its heatmap blended in. This is what gets analyzed
/// and saved.
#[derive(Debug, Clone)]
pub struct CombinedImage {
    pixels: RgbaImage,
}

impl CombinedImage {
    pub fn from_uploads(ui_bytes: &[u8], heatmap_bytes: &[u8]) -> Result<Self, HeatlensError> {
        composite::blend_bytes(ui_bytes, heatmap_bytes).map(Self::from)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Lossless PNG encoding.
    pub fn to_png(&self) -> Result<Vec<u8>, HeatlensError> {
        let mut buf = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| HeatlensError::ImageDecode {
                role: ImageRole::Combined,
                message: format!("PNG encoding failed: {e}"),
            })?;
        Ok(buf)
    }

    /// PNG bytes, base64 encoded for an LLM request.
    pub fn to_inline_png(&self) -> Result<InlineImage, HeatlensError> {
        Ok(InlineImage::png(STANDARD.encode(self.to_png()?)))
    }

    pub fn save_png(&self, path: &Path) -> Result<(), HeatlensError> {
        let bytes = self.to_png()?;
        std::fs::write(path, bytes).map_err(|e| HeatlensError::persistence(path, e))
    }
}

impl From<RgbaImage> for CombinedImage {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn inline_png_decodes_back_to_same_pixels() {
        let img = CombinedImage::from(RgbaImage::from_pixel(5, 4, Rgba([9, 8, 7, 255])));
        let inline = img.to_inline_png().unwrap();
        assert_eq!(inline.mime_type, "image/png");

        let bytes = STANDARD.decode(inline.base64).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (5, 4));
        assert_eq!(decoded.get_pixel(2, 2), &Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn save_png_into_missing_dir_is_persistence_error() {
        let dir = std::env::temp_dir().join("heatlens-no-such-dir-for-test");
        let img = CombinedImage::from(RgbaImage::new(1, 1));
        let err = img.save_png(&dir.join("nested").join("x.png")).unwrap_err();
        assert!(matches!(err, HeatlensError::Persistence { .. }));
    }
}
