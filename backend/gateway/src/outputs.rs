//! Serves saved combined images and report files from the output directory.

use std::path::{Component, Path, PathBuf};

use axum::{
    extract::{Path as UrlPath, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use heatlens_media::{detect_mime_type, is_inline_safe};
use tokio::fs;
use tracing::{debug, warn};

use crate::server::GatewayState;

/// Resolve a request path inside `root`, rejecting anything that could
/// escape it.
pub fn resolve_output_path(root: &Path, requested: &str) -> Option<PathBuf> {
    if requested.is_empty() || requested.contains('\\') {
        return None;
    }
    let relative = Path::new(requested);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

/// `file` relative to `root`, with forward slashes.
pub fn relative_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    parts.join("/")
}

/// URL under which a file in the output directory is served.
pub fn output_url(root: &Path, file: &Path) -> String {
    format!("/outputs/{}", relative_path(root, file))
}

/// GET /outputs/*path: stream a stored output file.
pub async fn serve_output(
    UrlPath(requested): UrlPath<String>,
    State(state): State<GatewayState>,
) -> Response {
    let root = state.workflow.output_dir();
    let Some(path) = resolve_output_path(root, &requested) else {
        warn!(requested = %requested, "Rejected suspicious output path");
        return (StatusCode::BAD_REQUEST, "Invalid path").into_response();
    };

    debug!(path = %path.display(), "Serving output file");
    match fs::read(&path).await {
        Ok(bytes) => {
            let mime = detect_mime_type(&path);
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let disposition = if is_inline_safe(mime) {
                format!("inline; filename=\"{filename}\"")
            } else {
                format!("attachment; filename=\"{filename}\"")
            };

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::CACHE_CONTROL, "no-cache".to_string()),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) if matches!(e.kind(), std::io::ErrorKind::NotFound | std::io::ErrorKind::IsADirectory) => {
            (StatusCode::NOT_FOUND, "Output file not found").into_response()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read output file");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read output").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nested_relative_paths() {
        let root = Path::new("/srv/outputs");
        assert_eq!(
            resolve_output_path(root, "images/combined_1.png"),
            Some(PathBuf::from("/srv/outputs/images/combined_1.png"))
        );
    }

    #[test]
    fn rejects_traversal_and_absolute_paths() {
        let root = Path::new("/srv/outputs");
        for bad in ["../secret", "images/../../etc/passwd", "/etc/passwd", "a\\b", "", "./x"] {
            assert_eq!(resolve_output_path(root, bad), None, "{bad}");
        }
    }

    #[test]
    fn url_is_relative_to_root() {
        let root = Path::new("/srv/outputs");
        assert_eq!(
            output_url(root, Path::new("/srv/outputs/ui_analysis_20240101000000.md")),
            "/outputs/ui_analysis_20240101000000.md"
        );
    }
}
