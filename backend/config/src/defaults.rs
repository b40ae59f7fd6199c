//! Config defaults: applies sensible default values to parsed config.

use crate::schema::{
    BatchConfig, HeatlensConfig, LoggingConfig, ProviderConfig, ProviderKind, ServerConfig,
    StageConfig, StorageConfig, SynthesisConfig,
};

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Images per consolidated report.
pub const DEFAULT_BATCH_SIZE: usize = 3;

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_ANALYZER_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_SYNTHESIS_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: HeatlensConfig) -> HeatlensConfig {
    let config = apply_provider_defaults(config);
    let config = apply_server_defaults(config);
    let config = apply_storage_defaults(config);
    let config = apply_batch_defaults(config);
    let config = apply_stage_defaults(config);
    apply_logging_defaults(config)
}

/// With no providers configured, register an OpenAI provider whose key is
/// picked up from the environment.
fn apply_provider_defaults(mut config: HeatlensConfig) -> HeatlensConfig {
    if config.providers.is_empty() {
        config.providers.insert(
            DEFAULT_PROVIDER.to_string(),
            ProviderConfig::new(ProviderKind::OpenAi),
        );
    }
    config
}

fn apply_server_defaults(mut config: HeatlensConfig) -> HeatlensConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    server.port.get_or_insert(DEFAULT_PORT);
    config
}

fn apply_storage_defaults(mut config: HeatlensConfig) -> HeatlensConfig {
    let storage = config.storage.get_or_insert_with(StorageConfig::default);
    storage.output_dir.get_or_insert_with(|| DEFAULT_OUTPUT_DIR.to_string());
    storage.images_dir.get_or_insert_with(|| DEFAULT_IMAGES_DIR.to_string());
    storage.inline_images.get_or_insert(false);
    config
}

fn apply_batch_defaults(mut config: HeatlensConfig) -> HeatlensConfig {
    let batch = config.batch.get_or_insert_with(BatchConfig::default);
    batch.size.get_or_insert(DEFAULT_BATCH_SIZE);
    config
}

/// Pin each stage to a concrete provider and model so `config show` reports
/// what will actually be called.
fn apply_stage_defaults(mut config: HeatlensConfig) -> HeatlensConfig {
    let first_provider = config.providers.keys().next().cloned();
    let default_model = |cfg: &HeatlensConfig, provider: &str| {
        cfg.providers
            .get(provider)
            .map(|p| p.kind.default_model())
            .unwrap_or(ProviderKind::OpenAi.default_model())
            .to_string()
    };

    let fill = |stage: &mut StageConfig, cfg: &HeatlensConfig, max_tokens: u32| {
        if stage.provider.is_none() {
            stage.provider = first_provider.clone();
        }
        if stage.model.is_none() {
            let provider = stage.provider.clone().unwrap_or_default();
            stage.model = Some(default_model(cfg, &provider));
        }
        stage.max_tokens.get_or_insert(max_tokens);
        stage.temperature.get_or_insert(DEFAULT_TEMPERATURE);
    };

    let snapshot = config.clone();
    fill(
        config.analyzer.get_or_insert_with(StageConfig::default),
        &snapshot,
        DEFAULT_ANALYZER_MAX_TOKENS,
    );
    let synthesis = config.synthesis.get_or_insert_with(SynthesisConfig::default);
    fill(
        synthesis.recommender.get_or_insert_with(StageConfig::default),
        &snapshot,
        DEFAULT_SYNTHESIS_MAX_TOKENS,
    );
    fill(
        synthesis.compiler.get_or_insert_with(StageConfig::default),
        &snapshot,
        DEFAULT_SYNTHESIS_MAX_TOKENS,
    );
    config
}

fn apply_logging_defaults(mut config: HeatlensConfig) -> HeatlensConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| "info".to_string());
    logging.json.get_or_insert(false);
    config
}
