//! `heatlens config init|show`.

use std::path::Path;

use anyhow::{bail, Result};
use heatlens_config::{apply_all_defaults, redact, validate, write_config, HeatlensConfig};

use crate::OutputFormat;

pub async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    write_config(&apply_all_defaults(HeatlensConfig::default()), path).await?;
    println!("Wrote config to {}", path.display());
    println!("Set OPENAI_API_KEY or edit providers.openai.apiKey before running `heatlens serve`.");
    Ok(())
}

pub async fn show(path: &Path, format: OutputFormat) -> Result<()> {
    let config = heatlens_config::load(path).await?;
    println!("{}", render(&config, format)?);

    let report = validate(&config);
    for warning in &report.warnings {
        eprintln!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        eprintln!("error: {}: {}", error.path, error.message);
    }
    Ok(())
}

/// Effective config with secrets masked.
fn render(config: &HeatlensConfig, format: OutputFormat) -> Result<String> {
    let value = redact(&serde_json::to_value(config)?);
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(&value)?,
        OutputFormat::Json => serde_json::to_string_pretty(&value)?,
    })
}
