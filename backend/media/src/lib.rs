//! Image handling for heatlens: decoding uploads, blending the gaze heatmap
//! over the UI screenshot, and encoding the result for analysis and storage.

pub mod combined;
pub mod composite;
pub mod mime_detect;

pub use combined::CombinedImage;
pub use composite::{blend, blend_bytes, decode};
pub use mime_detect::{detect_mime_type, is_image, is_inline_safe, sniff_image_mime};
