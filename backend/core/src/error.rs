use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which upload an image error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Ui,
    Heatmap,
    Combined,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRole::Ui => write!(f, "ui"),
            ImageRole::Heatmap => write!(f, "heatmap"),
            ImageRole::Combined => write!(f, "combined"),
        }
    }
}

/// Top-level error type for the heatlens pipeline.
#[derive(Debug, Error)]
pub enum HeatlensError {
    #[error("failed to decode {role} image: {message}")]
    ImageDecode { role: ImageRole, message: String },

    #[error("dimension mismatch: expected {}x{}, got {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("external service error ({service}): {message}")]
    ExternalService { service: String, message: String },

    #[error("persistence error at {}: {message}", .path.display())]
    Persistence { path: PathBuf, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HeatlensError {
    pub fn external(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.to_string(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Only failures of an external LLM call are worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalService { .. })
    }

    /// Short machine-readable label, used in API responses and event logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ImageDecode { .. } => "image_decode",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::ExternalService { .. } => "external_service",
            Self::Persistence { .. } => "persistence",
            Self::Config(_) => "config",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Other(_) => "internal",
        }
    }
}
