//! JSON API handlers.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use heatlens_workflow::Submission;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::outputs::{output_url, relative_path};
use crate::server::GatewayState;

/// POST /upload_heatmap: multipart with `heatmap` and `ui_image` parts.
pub async fn upload_heatmap(
    State(state): State<GatewayState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut heatmap = None;
    let mut ui_image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name != "heatmap" && name != "ui_image" {
            debug!(field = %name, "Ignoring unexpected multipart field");
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read '{name}': {e}")))?;
        if name == "heatmap" {
            heatmap = Some(bytes.to_vec());
        } else {
            ui_image = Some(bytes.to_vec());
        }
    }

    // Browsers send an empty part when no file was picked.
    let heatmap = heatmap
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing 'heatmap' file"))?;
    let ui_image = ui_image
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing 'ui_image' file"))?;

    info!(
        ui_bytes = ui_image.len(),
        heatmap_bytes = heatmap.len(),
        "Received heatmap upload"
    );
    let workflow = &state.workflow;
    let body = match workflow.submit(ui_image, heatmap).await? {
        Submission::Accumulated { count, capacity } => json!({
            "message": format!("Analysis stored ({count}/{capacity} images in the current batch)"),
            "status": "accumulated",
            "count": count,
            "capacity": capacity,
        }),
        Submission::ReportWritten { path, images } => {
            let root = workflow.output_dir();
            json!({
                "message": format!("Batch of {images} images complete, report written"),
                "status": "report_written",
                "path": relative_path(root, &path),
                "url": output_url(root, &path),
                "images": images,
            })
        }
    };
    Ok(Json(body))
}

/// GET /get_analysis: most recent consolidated report.
pub async fn get_analysis(State(state): State<GatewayState>) -> Response {
    let workflow = &state.workflow;
    match workflow.latest_report().await {
        Some(latest) => {
            let root = workflow.output_dir();
            Json(json!({
                "analysis": latest.text,
                "path": relative_path(root, &latest.path),
                "url": output_url(root, &latest.path),
            }))
            .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No analysis available" })),
        )
            .into_response(),
    }
}

/// GET /api/health
pub async fn health(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "pending": state.workflow.pending().await,
        "capacity": state.workflow.capacity(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
