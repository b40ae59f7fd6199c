//! Mapping pipeline errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use heatlens_core::HeatlensError;
use heatlens_logging::redact_sensitive_data;
use serde_json::json;
use tracing::warn;

/// A pipeline error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub HeatlensError);

impl From<HeatlensError> for ApiError {
    fn from(err: HeatlensError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(HeatlensError::InvalidRequest(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HeatlensError::ImageDecode { .. }
            | HeatlensError::DimensionMismatch { .. }
            | HeatlensError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            HeatlensError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            HeatlensError::Persistence { .. }
            | HeatlensError::Config(_)
            | HeatlensError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Generic message shown to the client; the detail carries specifics.
    fn message(&self) -> &'static str {
        match &self.0 {
            HeatlensError::ImageDecode { .. } | HeatlensError::DimensionMismatch { .. } => {
                "Invalid image upload"
            }
            HeatlensError::InvalidRequest(_) => "Invalid request",
            HeatlensError::ExternalService { .. } => "Failed to analyze heatmap",
            HeatlensError::Persistence { .. } => "Failed to save analysis",
            HeatlensError::Config(_) | HeatlensError::Other(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = redact_sensitive_data(&self.0.to_string());
        warn!(status = status.as_u16(), kind = self.0.kind(), details = %details, "Request failed");
        let body = json!({
            "error": self.message(),
            "kind": self.0.kind(),
            "details": details,
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlens_core::ImageRole;

    #[test]
    fn status_mapping() {
        let decode = ApiError(HeatlensError::ImageDecode {
            role: ImageRole::Ui,
            message: "bad".into(),
        });
        assert_eq!(decode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(HeatlensError::external("ui_recommender", "timeout")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(HeatlensError::persistence("/out/x.md", "disk full")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn details_are_redacted() {
        let err = ApiError(HeatlensError::external(
            "openai",
            "401 for key sk-abcdefghijklmnopqrstuvwxyz123456",
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Failed to analyze heatmap");
        assert_eq!(body["kind"], "external_service");
        assert!(!body["details"].as_str().unwrap().contains("abcdefghij"));
    }
}
