//! heatlens runtime configuration schema.
//!
//! Every leaf is optional so a partial YAML file deserializes cleanly;
//! `defaults::apply_all_defaults` fills the gaps and the accessor methods
//! at the bottom of this file are what the rest of the workspace reads.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use heatlens_core::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatlensConfig {
    /// HTTP server settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Where combined images and reports are written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Batch accumulation settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchConfig>,

    /// Named LLM providers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub providers: BTreeMap<String, ProviderConfig>,

    /// Single-image analyzer stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<StageConfig>,

    /// Two-stage synthesis pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<SynthesisConfig>,

    /// Retry policy for external calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Timeout applied to every external HTTP call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// Sub-directory of `outputDir` for combined images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_dir: Option<String>,
    /// Embed images in reports as data URIs instead of relative links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_images: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions (OpenAI, OpenRouter, local gateways)
    OpenAi,
    Gemini,
    /// Canned responses; for offline runs and tests
    Mock,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::Mock => "mock",
        }
    }

    pub fn needs_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Mock)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Fixed reply for `mock` providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            api_key: None,
            base_url: None,
            response: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    /// Name of an entry in `providers`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Analyzer only: reject free-form text responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_structured: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommender: Option<StageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<StageConfig>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rolling NDJSON log files; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Emit console logs as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

/// Which pipeline stage a [`StageSettings`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analyzer,
    Recommender,
    Compiler,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Analyzer => "analyzer",
            Stage::Recommender => "ui_recommender",
            Stage::Compiler => "report_compiler",
        }
    }
}

/// A stage with every default filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSettings {
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub require_structured: bool,
}

impl HeatlensConfig {
    pub fn bind_address(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| defaults::DEFAULT_BIND.to_string())
    }

    pub fn port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(defaults::DEFAULT_PORT)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(
            self.storage
                .as_ref()
                .and_then(|s| s.output_dir.clone())
                .unwrap_or_else(|| defaults::DEFAULT_OUTPUT_DIR.to_string()),
        )
    }

    pub fn images_dir(&self) -> PathBuf {
        let sub = self
            .storage
            .as_ref()
            .and_then(|s| s.images_dir.clone())
            .unwrap_or_else(|| defaults::DEFAULT_IMAGES_DIR.to_string());
        self.output_dir().join(sub)
    }

    pub fn inline_images(&self) -> bool {
        self.storage
            .as_ref()
            .and_then(|s| s.inline_images)
            .unwrap_or(false)
    }

    pub fn batch_size(&self) -> usize {
        self.batch
            .as_ref()
            .and_then(|b| b.size)
            .unwrap_or(defaults::DEFAULT_BATCH_SIZE)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(defaults::DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default()
    }

    pub fn log_level(&self) -> String {
        self.logging
            .as_ref()
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "info".to_string())
    }

    pub fn stage_config(&self, stage: Stage) -> Option<&StageConfig> {
        match stage {
            Stage::Analyzer => self.analyzer.as_ref(),
            Stage::Recommender => self.synthesis.as_ref().and_then(|s| s.recommender.as_ref()),
            Stage::Compiler => self.synthesis.as_ref().and_then(|s| s.compiler.as_ref()),
        }
    }

    /// Resolve a stage, falling back to the first configured provider and
    /// that provider's default model.
    pub fn stage(&self, stage: Stage) -> StageSettings {
        let cfg = self.stage_config(stage).cloned().unwrap_or_default();
        let provider = cfg
            .provider
            .or_else(|| self.providers.keys().next().cloned())
            .unwrap_or_else(|| defaults::DEFAULT_PROVIDER.to_string());
        let model = cfg.model.unwrap_or_else(|| {
            self.providers
                .get(&provider)
                .map(|p| p.kind.default_model())
                .unwrap_or(ProviderKind::OpenAi.default_model())
                .to_string()
        });
        StageSettings {
            provider,
            model,
            max_tokens: cfg.max_tokens.unwrap_or(match stage {
                Stage::Analyzer => defaults::DEFAULT_ANALYZER_MAX_TOKENS,
                _ => defaults::DEFAULT_SYNTHESIS_MAX_TOKENS,
            }),
            temperature: cfg.temperature.unwrap_or(defaults::DEFAULT_TEMPERATURE),
            require_structured: cfg.require_structured.unwrap_or(false),
        }
    }
}
