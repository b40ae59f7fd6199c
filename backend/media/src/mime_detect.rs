//! MIME type detection for uploads and stored outputs.

use std::path::Path;

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "bmp"          => "image/bmp",

        "md"           => "text/markdown; charset=utf-8",
        "txt"          => "text/plain; charset=utf-8",
        "json"         => "application/json",
        "html" | "htm" => "text/html; charset=utf-8",

        _              => "application/octet-stream",
    }
}

/// Sniff the MIME type of an uploaded image from its magic bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}

/// Whether a MIME type is for an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// Whether a file can be shown inline by a browser instead of downloaded.
pub fn is_inline_safe(mime: &str) -> bool {
    is_image(mime) || mime.starts_with("text/") || mime == "application/json"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension() {
        assert_eq!(detect_mime_type(Path::new("images/combined_1.PNG")), "image/png");
        assert_eq!(
            detect_mime_type(Path::new("ui_analysis_20250101120000.md")),
            "text/markdown; charset=utf-8"
        );
        assert_eq!(detect_mime_type(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn sniffs_png_magic() {
        let png_magic = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(sniff_image_mime(&png_magic), Some("image/png"));
        assert_eq!(sniff_image_mime(b"hello"), None);
    }

    #[test]
    fn inline_safety() {
        assert!(is_inline_safe("image/png"));
        assert!(is_inline_safe("text/markdown; charset=utf-8"));
        assert!(!is_inline_safe("application/octet-stream"));
    }
}
