//! Heatmap compositing: alpha-blend a gaze heatmap over a UI screenshot.

use heatlens_core::{HeatlensError, ImageRole};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};
use tracing::debug;

/// Decode raw upload bytes into an image, tagging failures with the upload role.
pub fn decode(bytes: &[u8], role: ImageRole) -> Result<DynamicImage, HeatlensError> {
    if bytes.is_empty() {
        return Err(HeatlensError::ImageDecode {
            role,
            message: "empty upload".to_string(),
        });
    }
    image::load_from_memory(bytes).map_err(|e| HeatlensError::ImageDecode {
        role,
        message: e.to_string(),
    })
}

/// Blend `heatmap` over `ui`.
///
/// The heatmap is resampled to the UI dimensions when they differ. Each output
/// channel is `ui * (1 - a) + heat * a` with `a` the heatmap alpha in [0, 1];
/// the output is fully opaque.
pub fn blend(ui: &DynamicImage, heatmap: &DynamicImage) -> Result<RgbaImage, HeatlensError> {
    let ui = ui.to_rgba8();
    let (width, height) = ui.dimensions();
    let overlay = fit_overlay(heatmap.to_rgba8(), width, height)?;

    let mut out: RgbaImage = ImageBuffer::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let base = ui.get_pixel(x, y);
        let heat = overlay.get_pixel(x, y);
        *pixel = blend_pixel(base, heat);
    }
    Ok(out)
}

/// Decode both uploads and blend them.
pub fn blend_bytes(ui_bytes: &[u8], heatmap_bytes: &[u8]) -> Result<RgbaImage, HeatlensError> {
    let ui = decode(ui_bytes, ImageRole::Ui)?;
    let heatmap = decode(heatmap_bytes, ImageRole::Heatmap)?;
    blend(&ui, &heatmap)
}

fn fit_overlay(overlay: RgbaImage, width: u32, height: u32) -> Result<RgbaImage, HeatlensError> {
    let actual = overlay.dimensions();
    if actual == (width, height) {
        return Ok(overlay);
    }
    if width == 0 || height == 0 || actual.0 == 0 || actual.1 == 0 {
        return Err(HeatlensError::DimensionMismatch {
            expected: (width, height),
            actual,
        });
    }

    debug!(
        from_w = actual.0,
        from_h = actual.1,
        to_w = width,
        to_h = height,
        "Resampling heatmap to UI dimensions"
    );
    let resized = imageops::resize(&overlay, width, height, FilterType::Triangle);
    if resized.dimensions() != (width, height) {
        return Err(HeatlensError::DimensionMismatch {
            expected: (width, height),
            actual: resized.dimensions(),
        });
    }
    Ok(resized)
}

fn blend_pixel(base: &Rgba<u8>, heat: &Rgba<u8>) -> Rgba<u8> {
    let alpha = heat[3] as f32 / 255.0;
    let mix = |b: u8, h: u8| {
        let v = (b as f32 / 255.0) * (1.0 - alpha) + (h as f32 / 255.0) * alpha;
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };
    Rgba([mix(base[0], heat[0]), mix(base[1], heat[1]), mix(base[2], heat[2]), 255])
}
