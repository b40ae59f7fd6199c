//! `heatlens-config`: runtime configuration for the heatlens workspace.
//!
//! Provides:
//! - Typed config schema (server, storage, batch, providers, stages)
//! - YAML read and atomic write
//! - `${ENV_VAR}` substitution and `HEATLENS_*` overrides
//! - Config redaction for safe display
//! - Default value application and validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, apply_env_overrides_with, resolve_env_vars, resolve_env_vars_with,
    MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_raw, resolve_config_path, write_config};
pub use redact::redact;
pub use schema::{
    HeatlensConfig, ProviderConfig, ProviderKind, Stage, StageConfig, StageSettings,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use heatlens_core::HeatlensError;
use std::path::Path;

/// Load a config file, substitute env vars, apply overrides and defaults,
/// then validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// errors fail the load; warnings are only logged.
pub async fn load_and_prepare(path: &Path) -> Result<HeatlensConfig> {
    prepare(load(path).await?)
}

/// Load a config file with env substitution, overrides and defaults applied
/// but without validating it.
pub async fn load(path: &Path) -> Result<HeatlensConfig> {
    let value = load_raw(path).await?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: HeatlensConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    Ok(apply_all_defaults(apply_env_overrides(config)))
}

/// Apply defaults and validate an already-parsed config.
pub fn prepare(config: HeatlensConfig) -> Result<HeatlensConfig> {
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.first() {
        return Err(HeatlensError::Config(format!(
            "{} ({} error(s) total)",
            first,
            report.errors.len()
        ))
        .into());
    }

    Ok(config)
}
