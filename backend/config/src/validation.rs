//! Config validation: checks with user-friendly error messages.

use crate::schema::{HeatlensConfig, Stage};
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &HeatlensConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_storage(config, &mut report);
    validate_batch(config, &mut report);
    validate_providers(config, &mut report);
    validate_stages(config, &mut report);
    validate_retry(config, &mut report);
    report
}

fn validate_server(config: &HeatlensConfig, report: &mut ValidationReport) {
    let port = config.port();
    if port == 0 {
        report.error("server.port", "port must be > 0");
    } else if port < 1024 && port != 80 && port != 443 {
        report.warn(
            "server.port",
            format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
        );
    }
}

fn validate_storage(config: &HeatlensConfig, report: &mut ValidationReport) {
    let Some(storage) = &config.storage else { return };
    if storage.output_dir.as_deref().map(str::trim) == Some("") {
        report.error("storage.outputDir", "outputDir cannot be empty");
    }
    if let Some(images) = &storage.images_dir {
        if images.contains("..") {
            report.error("storage.imagesDir", "imagesDir must stay inside outputDir");
        }
    }
}

fn validate_batch(config: &HeatlensConfig, report: &mut ValidationReport) {
    let size = config.batch_size();
    if size == 0 {
        report.error("batch.size", "batch size must be >= 1");
    } else if size > 20 {
        report.warn(
            "batch.size",
            format!("batch size {size} produces very long synthesis prompts"),
        );
    }
}

fn validate_providers(config: &HeatlensConfig, report: &mut ValidationReport) {
    if config.providers.is_empty() {
        report.error("providers", "At least one provider must be configured");
    }
    for (name, provider) in &config.providers {
        let path = format!("providers.{name}");
        if name.trim().is_empty() {
            report.error("providers", "Provider name cannot be empty");
        }
        if provider.kind.needs_api_key()
            && provider.api_key.as_deref().map(str::is_empty).unwrap_or(true)
        {
            report.error(format!("{path}.apiKey"), "API key is required for this provider");
        }
        if let Some(url) = &provider.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                report.error(format!("{path}.baseUrl"), "baseUrl must be an http(s) URL");
            }
        }
    }
}

fn validate_stages(config: &HeatlensConfig, report: &mut ValidationReport) {
    for stage in [Stage::Analyzer, Stage::Recommender, Stage::Compiler] {
        let settings = config.stage(stage);
        let path = stage.name();
        if !config.providers.contains_key(&settings.provider) {
            report.error(
                format!("{path}.provider"),
                format!("Unknown provider '{}'", settings.provider),
            );
        }
        if settings.max_tokens == 0 {
            report.error(format!("{path}.maxTokens"), "maxTokens must be > 0");
        }
        if !(0.0..=2.0).contains(&settings.temperature) {
            report.error(format!("{path}.temperature"), "temperature must be within 0..=2");
        }
    }
}

fn validate_retry(config: &HeatlensConfig, report: &mut ValidationReport) {
    let Some(retry) = &config.retry else { return };
    if retry.max_attempts == 0 {
        report.error("retry.maxAttempts", "maxAttempts must be >= 1");
    }
    if retry.backoff_factor < 1.0 {
        report.warn("retry.backoffFactor", "backoffFactor below 1 shrinks delays");
    }
}
